use crate::{
    column::{Column, ColumnKey, ColumnMetadata},
    query::{QuerySynthesisError, QuerySynthesizer},
    registry::ColumnRegistry,
    test_support::orders_schema,
    types::{ColumnKind, ColumnType},
};

fn allocated(shard: &str, index: usize) -> Column {
    Column {
        key: ColumnKey::new(shard, format!("{shard}__{index}")),
        column_type: ColumnType::Double,
        metadata: ColumnMetadata::numeric(),
        primary_key: false,
        foreign_key: false,
        ordinal: index,
    }
}

fn sharded_registry() -> ColumnRegistry {
    let mut registry =
        ColumnRegistry::from_base_schema(&orders_schema(), &ColumnKind::DEFAULT_NUMERIC);
    registry.register(allocated("orders_2", 0));
    registry.register(allocated("orders_1", 0));
    registry.register(allocated("orders_1", 1));

    registry
}

#[test]
fn select_joins_every_involved_shard_on_the_primary_key() {
    let registry = sharded_registry();
    let keys = [
        ColumnKey::new("orders_2", "orders_2__0"),
        ColumnKey::new("orders", "id"),
        ColumnKey::new("orders_1", "orders_1__1"),
    ];

    let select = QuerySynthesizer::new(&registry)
        .select(Some(&keys[..]))
        .expect("select");

    assert_eq!(
        select.to_string(),
        "SELECT `orders_2`.`orders_2__0`, `orders`.`id`, `orders_1`.`orders_1__1` \
         FROM `orders` \
         JOIN `orders_1` ON `orders`.`id` = `orders_1`.`id` \
         JOIN `orders_2` ON `orders`.`id` = `orders_2`.`id` \
         GROUP BY `orders`.`id` ORDER BY `orders`.`id`"
    );
}

#[test]
fn base_falls_back_to_first_shard_by_name() {
    let registry = sharded_registry();
    let keys = [
        ColumnKey::new("orders_2", "orders_2__0"),
        ColumnKey::new("orders_1", "orders_1__0"),
    ];

    let select = QuerySynthesizer::new(&registry)
        .select(Some(&keys[..]))
        .expect("select");

    assert_eq!(select.source.base, "orders_1");
    assert_eq!(select.source.joins, vec!["orders_2"]);
    assert_eq!(select.source.primary_key, "id");
}

#[test]
fn duplicate_keys_keep_first_occurrence() {
    let registry = sharded_registry();
    let a = ColumnKey::new("orders_1", "orders_1__1");
    let b = ColumnKey::new("orders", "amount");

    let select = QuerySynthesizer::new(&registry)
        .select(Some(&[a.clone(), b.clone(), a.clone()][..]))
        .expect("select");

    assert_eq!(select.projection, vec![a, b]);
}

#[test]
fn omitted_columns_select_everything_in_registry_order() {
    let registry = sharded_registry();

    let select = QuerySynthesizer::new(&registry).select(None).expect("select");

    assert_eq!(
        select.output_names(),
        vec![
            "id",
            "customer_id",
            "amount",
            "status",
            "orders_1__0",
            "orders_1__1",
            "orders_2__0"
        ]
    );
    assert_eq!(select.source.joins, vec!["orders_1", "orders_2"]);
}

#[test]
fn synthesis_errors() {
    let registry = sharded_registry();
    let synth = QuerySynthesizer::new(&registry);

    assert_eq!(
        synth.select(Some([].as_slice())),
        Err(QuerySynthesisError::EmptyColumnSet)
    );

    let missing = ColumnKey::new("orders_9", "x");
    assert_eq!(
        synth.select(Some(&[missing.clone()][..])),
        Err(QuerySynthesisError::UnknownColumn(missing))
    );

    let mut keyless = ColumnRegistry::new();
    keyless.register(allocated("orders_1", 0));
    assert_eq!(
        QuerySynthesizer::new(&keyless).select(None),
        Err(QuerySynthesisError::NoPrimaryKey)
    );
}

#[test]
fn count_distinct_shares_the_join() {
    let registry = sharded_registry();
    let keys = [
        ColumnKey::new("orders", "status"),
        ColumnKey::new("orders_2", "orders_2__0"),
    ];

    let count = QuerySynthesizer::new(&registry)
        .count_distinct(Some(&keys[..]))
        .expect("count distinct");

    assert_eq!(
        count.to_string(),
        "SELECT COUNT(DISTINCT `orders`.`status`), COUNT(DISTINCT `orders_2`.`orders_2__0`) \
         FROM `orders` JOIN `orders_2` ON `orders`.`id` = `orders_2`.`id`"
    );
}
