use crate::{
    column::ColumnKey,
    sql::{AlterOp, AlterTable, CountDistinct, Ident, JoinSource, SelectStatement, Statement},
    types::ColumnType,
};

fn orders_source(joins: &[&str]) -> JoinSource {
    JoinSource {
        base: "orders".to_string(),
        joins: joins.iter().map(ToString::to_string).collect(),
        primary_key: "id".to_string(),
    }
}

#[test]
fn identifiers_double_embedded_backticks() {
    assert_eq!(Ident("plain").to_string(), "`plain`");
    assert_eq!(Ident("we`ird").to_string(), "`we``ird`");
    assert_eq!(Ident("``").to_string(), "``````");
}

#[test]
fn shard_clone_statements_render() {
    let create = Statement::CreateTableLike {
        table: "orders_1".into(),
        like: "orders".into(),
    };
    let copy = Statement::InsertSelectAll {
        table: "orders_1".into(),
        source: "orders".into(),
    };
    let count = Statement::CountRows {
        table: "orders".into(),
    };

    assert_eq!(create.to_string(), "CREATE TABLE `orders_1` LIKE `orders`");
    assert_eq!(
        copy.to_string(),
        "INSERT INTO `orders_1` SELECT * FROM `orders`"
    );
    assert_eq!(count.to_string(), "SELECT count(*) FROM `orders`");
    assert!(create.is_mutation());
    assert!(!count.is_mutation());
}

#[test]
fn alter_batches_clauses_into_one_statement() {
    let add = AlterTable {
        table: "orders_1".into(),
        ops: vec![
            AlterOp::AddColumn {
                name: "orders_1__0".into(),
                column_type: ColumnType::Int,
            },
            AlterOp::AddColumn {
                name: "orders_1__1".into(),
                column_type: ColumnType::Varchar(32),
            },
        ],
    };
    let drop = AlterTable {
        table: "orders_1".into(),
        ops: vec![
            AlterOp::DropColumn {
                name: "orders_1__0".into(),
            },
            AlterOp::DropColumn {
                name: "orders_1__1".into(),
            },
        ],
    };

    assert_eq!(
        add.to_string(),
        "ALTER TABLE `orders_1` ADD COLUMN `orders_1__0` INT, ADD COLUMN `orders_1__1` VARCHAR(32)"
    );
    assert_eq!(
        drop.to_string(),
        "ALTER TABLE `orders_1` DROP COLUMN `orders_1__0`, DROP COLUMN `orders_1__1`"
    );
}

#[test]
fn select_joins_every_shard_on_primary_key() {
    let select = SelectStatement {
        projection: vec![
            ColumnKey::new("orders", "id"),
            ColumnKey::new("orders_1", "orders_1__0"),
            ColumnKey::new("orders_2", "orders_2__0"),
        ],
        source: orders_source(&["orders_1", "orders_2"]),
    };

    assert_eq!(
        select.to_string(),
        "SELECT `orders`.`id`, `orders_1`.`orders_1__0`, `orders_2`.`orders_2__0` \
         FROM `orders` \
         JOIN `orders_1` ON `orders`.`id` = `orders_1`.`id` \
         JOIN `orders_2` ON `orders`.`id` = `orders_2`.`id` \
         GROUP BY `orders`.`id` ORDER BY `orders`.`id`"
    );
    assert_eq!(
        select.output_names(),
        vec!["id", "orders_1__0", "orders_2__0"]
    );
}

#[test]
fn count_distinct_reuses_join_source() {
    let count = CountDistinct {
        columns: vec![
            ColumnKey::new("orders", "status"),
            ColumnKey::new("orders_1", "orders_1__0"),
        ],
        source: orders_source(&["orders_1"]),
    };

    assert_eq!(
        count.to_string(),
        "SELECT COUNT(DISTINCT `orders`.`status`), COUNT(DISTINCT `orders_1`.`orders_1__0`) \
         FROM `orders` JOIN `orders_1` ON `orders`.`id` = `orders_1`.`id`"
    );
}
