use crate::{
    ENGINE_MAX_COLUMNS,
    column::ColumnKey,
    engine::{Engine, EngineError, PhysicalColumn, Row, RowSet, TableSchema},
    sql::{AlterOp, AlterTable, CountDistinct, JoinSource, SelectStatement, Statement},
    value::Value,
};
use std::{cmp::Ordering, collections::BTreeMap};

type FaultRule = Box<dyn Fn(&Statement) -> bool>;

///
/// MemTable
///

#[derive(Clone, Debug, Default)]
struct MemTable {
    columns: Vec<PhysicalColumn>,
    rows: Vec<Row>,
}

impl MemTable {
    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

///
/// Joined
///
/// Row combinations produced by an inner join across a join source.
///

struct Joined<'a> {
    tables: Vec<&'a MemTable>,
    combos: Vec<Vec<usize>>,
    base_pk: usize,
}

impl<'a> Joined<'a> {
    fn cell(&self, combo: &[usize], at: (usize, usize)) -> &'a Value {
        let (slot, pos) = at;

        &self.tables[slot].rows[combo[slot]][pos]
    }

    fn base_key(&self, combo: &[usize]) -> &'a Value {
        self.cell(combo, (0, self.base_pk))
    }

    // GROUP BY base.pk ORDER BY base.pk: first combination per key survives.
    fn group_by_primary_key(&mut self) {
        let mut combos = std::mem::take(&mut self.combos);
        combos.sort_by(|a, b| self.base_key(a).total_cmp(self.base_key(b)));
        combos.dedup_by(|a, b| self.base_key(a).total_cmp(self.base_key(b)) == Ordering::Equal);
        self.combos = combos;
    }
}

///
/// MemoryEngine
///
/// In-process engine that interprets the typed statement surface directly.
/// Every executed statement is recorded, and fault rules can make chosen
/// statements fail to exercise partial-failure paths.
///

pub struct MemoryEngine {
    tables: BTreeMap<String, MemTable>,
    column_limit: usize,
    executed: Vec<String>,
    faults: Vec<FaultRule>,
    reflect_faults: Vec<String>,
}

impl MemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
            column_limit: ENGINE_MAX_COLUMNS,
            executed: Vec::new(),
            faults: Vec::new(),
            reflect_faults: Vec::new(),
        }
    }

    /// Lower the per-table physical column limit.
    #[must_use]
    pub const fn with_column_limit(mut self, limit: usize) -> Self {
        self.column_limit = limit;
        self
    }

    pub fn create_table(
        &mut self,
        name: impl Into<String>,
        columns: Vec<PhysicalColumn>,
    ) -> Result<(), EngineError> {
        let name = name.into();
        if self.tables.contains_key(&name) {
            return Err(EngineError::new(format!("table '{name}' already exists")));
        }
        if columns.len() > self.column_limit {
            return Err(too_many_columns(&name, self.column_limit));
        }

        self.tables.insert(
            name,
            MemTable {
                columns,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn insert_row(&mut self, table: &str, row: Row) -> Result<(), EngineError> {
        let target = self
            .tables
            .get_mut(table)
            .ok_or_else(|| unknown_table(table))?;
        if row.len() != target.columns.len() {
            return Err(EngineError::new(format!(
                "row has {} values but '{table}' has {} columns",
                row.len(),
                target.columns.len()
            )));
        }

        target.rows.push(row);
        Ok(())
    }

    /// Fail every statement matching `rule` until faults are cleared.
    pub fn fail_when(&mut self, rule: impl Fn(&Statement) -> bool + 'static) {
        self.faults.push(Box::new(rule));
    }

    /// Fail reflection of `table` until faults are cleared.
    pub fn fail_reflect(&mut self, table: impl Into<String>) {
        self.reflect_faults.push(table.into());
    }

    pub fn clear_faults(&mut self) {
        self.faults.clear();
        self.reflect_faults.clear();
    }

    /// Rendered text of every statement received, including failed ones.
    #[must_use]
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn clear_log(&mut self) {
        self.executed.clear();
    }

    #[must_use]
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    #[must_use]
    pub fn rows(&self, table: &str) -> Option<&[Row]> {
        self.tables.get(table).map(|t| t.rows.as_slice())
    }

    // ------------------------------------------------------------------
    // Statement interpretation
    // ------------------------------------------------------------------

    fn table(&self, name: &str) -> Result<&MemTable, EngineError> {
        self.tables.get(name).ok_or_else(|| unknown_table(name))
    }

    fn count_rows(&self, table: &str) -> Result<RowSet, EngineError> {
        let count = i64::try_from(self.table(table)?.rows.len())
            .map_err(|_| EngineError::new("row count overflow"))?;

        Ok(RowSet::new(
            vec!["count(*)".to_string()],
            vec![vec![Value::Int(count)]],
        ))
    }

    fn create_like(&mut self, table: &str, like: &str) -> Result<RowSet, EngineError> {
        if self.tables.contains_key(table) {
            return Err(EngineError::new(format!("table '{table}' already exists")));
        }

        // LIKE copies columns and keys, but not foreign key constraints
        let columns = self
            .table(like)?
            .columns
            .iter()
            .map(|c| PhysicalColumn {
                foreign_key: false,
                ..c.clone()
            })
            .collect();

        self.tables.insert(
            table.to_string(),
            MemTable {
                columns,
                rows: Vec::new(),
            },
        );
        Ok(RowSet::empty())
    }

    fn insert_select_all(&mut self, table: &str, source: &str) -> Result<RowSet, EngineError> {
        let source_table = self.table(source)?;
        let width = source_table.columns.len();
        let rows = source_table.rows.clone();

        let target = self
            .tables
            .get_mut(table)
            .ok_or_else(|| unknown_table(table))?;
        if target.columns.len() != width {
            return Err(EngineError::new(format!(
                "column count of '{table}' doesn't match '{source}'"
            )));
        }

        target.rows.extend(rows);
        Ok(RowSet::empty())
    }

    fn alter(&mut self, alter: &AlterTable) -> Result<RowSet, EngineError> {
        let limit = self.column_limit;
        let target = self
            .tables
            .get_mut(&alter.table)
            .ok_or_else(|| unknown_table(&alter.table))?;

        // validate the whole statement before touching anything
        let mut names: Vec<&str> = target.columns.iter().map(|c| c.name.as_str()).collect();
        for op in &alter.ops {
            match op {
                AlterOp::AddColumn { name, .. } => {
                    if names.contains(&name.as_str()) {
                        return Err(EngineError::new(format!("duplicate column name '{name}'")));
                    }
                    names.push(name);
                }
                AlterOp::DropColumn { name } => {
                    let Some(pos) = names.iter().position(|n| *n == name.as_str()) else {
                        return Err(EngineError::new(format!(
                            "can't drop '{name}'; check that column exists"
                        )));
                    };
                    names.remove(pos);
                }
            }
        }
        if names.is_empty() {
            return Err(EngineError::new(
                "can't delete all columns with ALTER TABLE",
            ));
        }
        if names.len() > limit {
            return Err(too_many_columns(&alter.table, limit));
        }

        for op in &alter.ops {
            match op {
                AlterOp::AddColumn { name, column_type } => {
                    target
                        .columns
                        .push(PhysicalColumn::new(name.clone(), column_type.clone()));
                    for row in &mut target.rows {
                        row.push(Value::Null);
                    }
                }
                AlterOp::DropColumn { name } => {
                    if let Some(pos) = target.position(name) {
                        target.columns.remove(pos);
                        for row in &mut target.rows {
                            row.remove(pos);
                        }
                    }
                }
            }
        }

        Ok(RowSet::empty())
    }

    // Inner join of every source table on the primary key.
    // Each combination holds one row index per table, in `source.tables()` order.
    fn join<'a>(&'a self, source: &JoinSource) -> Result<Joined<'a>, EngineError> {
        let tables = source
            .tables()
            .map(|name| self.table(name))
            .collect::<Result<Vec<_>, _>>()?;
        let pk_positions = tables
            .iter()
            .zip(source.tables())
            .map(|(table, name)| {
                table.position(&source.primary_key).ok_or_else(|| {
                    EngineError::new(format!(
                        "unknown column '{name}.{}' in 'on clause'",
                        source.primary_key
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let base = tables[0];
        let mut combos: Vec<Vec<usize>> = (0..base.rows.len()).map(|i| vec![i]).collect();

        for (slot, table) in tables.iter().enumerate().skip(1) {
            let mut next = Vec::new();
            for combo in combos {
                let key = &base.rows[combo[0]][pk_positions[0]];
                for (i, row) in table.rows.iter().enumerate() {
                    if key.sql_eq(&row[pk_positions[slot]]) {
                        let mut extended = combo.clone();
                        extended.push(i);
                        next.push(extended);
                    }
                }
            }
            combos = next;
        }

        Ok(Joined {
            tables,
            combos,
            base_pk: pk_positions[0],
        })
    }

    fn select(&self, select: &SelectStatement) -> Result<RowSet, EngineError> {
        let source = &select.source;
        let projection = select
            .projection
            .iter()
            .map(|key| self.resolve(source, key))
            .collect::<Result<Vec<_>, _>>()?;

        let mut joined = self.join(source)?;
        joined.group_by_primary_key();

        let rows: Vec<Row> = joined
            .combos
            .iter()
            .map(|combo| {
                projection
                    .iter()
                    .map(|at| joined.cell(combo, *at).clone())
                    .collect::<Row>()
            })
            .collect();

        Ok(RowSet::new(select.output_names(), rows))
    }

    // Resolve a qualified column into (table slot, column position) within a join source.
    fn resolve(&self, source: &JoinSource, key: &ColumnKey) -> Result<(usize, usize), EngineError> {
        let slot = source
            .tables()
            .position(|name| name == key.shard)
            .ok_or_else(|| {
                EngineError::new(format!("unknown table '{}' in field list", key.shard))
            })?;
        let pos = self
            .table(&key.shard)?
            .position(&key.name)
            .ok_or_else(|| EngineError::new(format!("unknown column '{key}' in field list")))?;

        Ok((slot, pos))
    }

    fn count_distinct(&self, count: &CountDistinct) -> Result<RowSet, EngineError> {
        let source = &count.source;
        let targets = count
            .columns
            .iter()
            .map(|key| self.resolve(source, key))
            .collect::<Result<Vec<_>, _>>()?;
        let joined = self.join(source)?;

        let mut row = Vec::with_capacity(targets.len());
        for at in targets {
            let mut values: Vec<&Value> = joined
                .combos
                .iter()
                .map(|combo| joined.cell(combo, at))
                .filter(|v| !v.is_null())
                .collect();
            values.sort_by(|a, b| a.total_cmp(b));
            values.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);

            let distinct = i64::try_from(values.len())
                .map_err(|_| EngineError::new("distinct count overflow"))?;
            row.push(Value::Int(distinct));
        }

        let names = count
            .columns
            .iter()
            .map(|key| format!("COUNT(DISTINCT {key})"))
            .collect();

        Ok(RowSet::new(names, vec![row]))
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MemoryEngine {
    fn execute(&mut self, statement: &Statement) -> Result<RowSet, EngineError> {
        self.executed.push(statement.to_string());

        if self.faults.iter().any(|rule| rule(statement)) {
            return Err(EngineError::new("injected fault"));
        }

        match statement {
            Statement::CountRows { table } => self.count_rows(table),
            Statement::CreateTableLike { table, like } => self.create_like(table, like),
            Statement::InsertSelectAll { table, source } => self.insert_select_all(table, source),
            Statement::AlterTable(alter) => self.alter(alter),
            Statement::Select(select) => self.select(select),
            Statement::CountDistinct(count) => self.count_distinct(count),
        }
    }

    fn reflect(&mut self, table: &str) -> Result<TableSchema, EngineError> {
        if self.reflect_faults.iter().any(|t| t == table) {
            return Err(EngineError::new(format!("injected reflection fault on '{table}'")));
        }

        let columns = self.table(table)?.columns.clone();

        Ok(TableSchema {
            name: table.to_string(),
            columns,
        })
    }
}

fn unknown_table(name: &str) -> EngineError {
    EngineError::new(format!("table '{name}' doesn't exist"))
}

fn too_many_columns(table: &str, limit: usize) -> EngineError {
    EngineError::new(format!("too many columns in '{table}' (limit {limit})"))
}
