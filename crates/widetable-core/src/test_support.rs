use crate::{
    engine::{MemoryEngine, PhysicalColumn, TableSchema},
    types::ColumnType,
    value::Value,
};

pub(crate) const ORDERS: &str = "orders";

/// Base `orders` table: `id` primary key plus three payload columns.
pub(crate) fn orders_columns() -> Vec<PhysicalColumn> {
    vec![
        PhysicalColumn::new("id", ColumnType::Int).primary_key(),
        PhysicalColumn::new("customer_id", ColumnType::Int).foreign_key(),
        PhysicalColumn::new("amount", ColumnType::Double),
        PhysicalColumn::new("status", ColumnType::Varchar(16)),
    ]
}

pub(crate) fn orders_schema() -> TableSchema {
    TableSchema {
        name: ORDERS.to_string(),
        columns: orders_columns(),
    }
}

/// Memory engine holding `orders` with `rows` rows, ids inserted in
/// descending order so ordering by key is observable.
pub(crate) fn orders_engine(rows: i64) -> MemoryEngine {
    let mut engine = MemoryEngine::new();
    engine
        .create_table(ORDERS, orders_columns())
        .expect("orders table should be created");

    for id in (1..=rows).rev() {
        let status = if id % 2 == 0 { "open" } else { "closed" };
        engine
            .insert_row(
                ORDERS,
                vec![
                    Value::Int(id),
                    Value::Int(100 + id % 3),
                    Value::Float(id as f64 * 1.5),
                    Value::from(status),
                ],
            )
            .expect("orders row should insert");
    }

    engine
}
