use crate::{
    column::{Column, ColumnKey, ColumnMetadata},
    engine::{PhysicalColumn, TableSchema},
    registry::{ColumnFilter, ColumnRegistry},
    types::{ColumnKind, ColumnType},
};
use proptest::prelude::*;

fn column(shard: &str, name: &str, ordinal: usize) -> Column {
    Column {
        key: ColumnKey::new(shard, name),
        column_type: ColumnType::Int,
        metadata: ColumnMetadata::numeric(),
        primary_key: false,
        foreign_key: false,
        ordinal,
    }
}

fn orders_schema() -> TableSchema {
    TableSchema {
        name: "orders".to_string(),
        columns: vec![
            PhysicalColumn::new("id", ColumnType::Int).primary_key(),
            PhysicalColumn::new("customer_id", ColumnType::Int).foreign_key(),
            PhysicalColumn::new("amount", ColumnType::Double),
            PhysicalColumn::new("status", ColumnType::Varchar(16)),
            PhysicalColumn::new("units", ColumnType::BigInt),
        ],
    }
}

#[test]
fn base_schema_classifies_numeric_columns() {
    let registry = ColumnRegistry::from_base_schema(&orders_schema(), &ColumnKind::DEFAULT_NUMERIC);
    let numeric: Vec<&str> = registry
        .numeric_columns(&ColumnFilter::new())
        .into_iter()
        .map(Column::name)
        .collect();

    // keys are never numeric, and BIGINT is outside the default set
    assert_eq!(numeric, vec!["amount"]);
    assert_eq!(
        registry
            .by_name("status")
            .and_then(|c| c.metadata.real_name.as_deref()),
        Some("status")
    );
    assert_eq!(registry.primary_key().map(Column::name), Some("id"));
}

#[test]
fn query_orders_by_shard_then_ordinal() {
    let mut registry = ColumnRegistry::new();
    registry.register(column("t_2", "t_2__0", 0));
    registry.register(column("t_1", "t_1__10", 10));
    registry.register(column("t_1", "t_1__2", 2));
    registry.register(column("t", "id", 0));

    let keys: Vec<String> = registry
        .query(&ColumnFilter::new())
        .into_iter()
        .map(|c| c.key.to_string())
        .collect();

    assert_eq!(keys, vec!["t.id", "t_1.t_1__2", "t_1.t_1__10", "t_2.t_2__0"]);
}

#[test]
fn first_only_returns_single_match_or_nothing() {
    let mut registry = ColumnRegistry::new();
    registry.register(column("b", "x", 0));
    registry.register(column("a", "x", 0));

    let first = registry.query(&ColumnFilter::new().first_only());
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].shard(), "a");

    let none = registry.query(&ColumnFilter::new().matching(|c| c.name() == "y").first_only());
    assert!(none.is_empty());
}

#[test]
fn by_name_prefers_first_shard_on_duplicates() {
    let mut registry = ColumnRegistry::new();
    registry.register(column("t_2", "foo", 0));
    registry.register(column("t_1", "foo", 0));

    assert_eq!(registry.by_name("foo").map(Column::shard), Some("t_1"));
    assert_eq!(
        registry.get(&ColumnKey::new("t_2", "foo")).map(Column::shard),
        Some("t_2")
    );

    let resolved = registry.names_to_columns(&["foo", "bar"]);
    assert!(resolved[0].is_some());
    assert!(resolved[1].is_none());
}

#[test]
fn register_overwrites_and_remove_forgets() {
    let mut registry = ColumnRegistry::new();
    registry.register(column("t_1", "c", 0));
    let previous = registry.register(Column {
        column_type: ColumnType::Double,
        ..column("t_1", "c", 0)
    });

    assert_eq!(previous.map(|c| c.column_type), Some(ColumnType::Int));
    assert_eq!(registry.len(), 1);

    registry.remove(&ColumnKey::new("t_1", "c"));
    assert!(!registry.exists("t_1", "c"));
    assert!(registry.is_empty());
}

#[test]
fn columns_of_type_matches_kind_not_parameters() {
    let mut registry = ColumnRegistry::new();
    registry.register(Column {
        column_type: ColumnType::Decimal {
            precision: 12,
            scale: 4,
        },
        ..column("t_1", "price", 0)
    });
    registry.register(column("t_1", "qty", 1));

    let decimals = registry.columns_of_type(&[ColumnKind::Decimal], &ColumnFilter::new());

    assert_eq!(decimals.len(), 1);
    assert_eq!(decimals[0].name(), "price");
}

#[test]
fn categorical_columns_reads_existing_flags_only() {
    let mut registry = ColumnRegistry::new();
    registry.register(Column {
        metadata: ColumnMetadata::default().with_categorical(true),
        ..column("t_1", "colour", 0)
    });
    registry.register(column("t_1", "weight", 1));

    let categorical = registry.categorical_columns(&ColumnFilter::new());

    assert_eq!(categorical.len(), 1);
    assert_eq!(categorical[0].name(), "colour");
}

fn arb_column() -> impl Strategy<Value = Column> {
    (0..3usize, 0..5usize, any::<bool>(), any::<bool>(), 0..8usize).prop_map(
        |(shard, name, primary_key, foreign_key, ordinal)| Column {
            primary_key,
            foreign_key,
            ..column(&format!("s{shard}"), &format!("c{name}"), ordinal)
        },
    )
}

proptest! {
    #[test]
    fn excluding_relationships_never_yields_keys(columns in prop::collection::vec(arb_column(), 0..24)) {
        let mut registry = ColumnRegistry::new();
        for column in columns {
            registry.register(column);
        }

        let filter = ColumnFilter::new().exclude_relationships();
        for column in registry.query(&filter) {
            prop_assert!(!column.primary_key);
            prop_assert!(!column.foreign_key);
        }
    }

    #[test]
    fn query_is_sorted_and_complete(columns in prop::collection::vec(arb_column(), 0..24)) {
        let mut registry = ColumnRegistry::new();
        for column in columns {
            registry.register(column);
        }

        let all = registry.query(&ColumnFilter::new());
        prop_assert_eq!(all.len(), registry.len());
        for pair in all.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            prop_assert!((a.shard(), a.ordinal, a.name()) <= (b.shard(), b.ordinal, b.name()));
        }
    }
}
