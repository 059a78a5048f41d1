use crate::{
    engine::Engine,
    shard::{ShardAllocator, ShardError},
    sql::Statement,
    test_support::{ORDERS, orders_engine, orders_schema},
};

#[test]
fn first_allocation_creates_a_cloned_shard() {
    let mut engine = orders_engine(4);
    let mut allocator = ShardAllocator::new(orders_schema(), 3);

    let slot = allocator.allocate_slot(&mut engine).expect("allocate");

    assert_eq!(slot.key.shard, "orders_1");
    assert_eq!(slot.key.name, "orders_1__0");
    assert_eq!(slot.ordinal, 0);
    assert_eq!(engine.rows("orders_1"), engine.rows(ORDERS));

    let shard = allocator.shard("orders_1").expect("shard registered");
    assert!(!shard.is_base());
    assert_eq!(shard.schema().primary_key_names(), vec!["id"]);
}

#[test]
fn ceiling_boundary_opens_exactly_one_new_shard() {
    let mut engine = orders_engine(2);
    let mut allocator = ShardAllocator::new(orders_schema(), 2);

    let keys: Vec<String> = (0..3)
        .map(|_| allocator.allocate_slot(&mut engine).expect("allocate").key.to_string())
        .collect();

    assert_eq!(
        keys,
        vec!["orders_1.orders_1__0", "orders_1.orders_1__1", "orders_2.orders_2__0"]
    );
    assert_eq!(allocator.shards().count(), 3);
    assert_eq!(allocator.active().map(|s| s.name()), Some("orders_2"));
    assert!(allocator.shard("orders_1").is_some_and(|s| s.is_full(2)));
}

#[test]
fn failed_clone_registers_nothing_and_consumes_the_counter() {
    let mut engine = orders_engine(2);
    engine.fail_when(|s| matches!(s, Statement::InsertSelectAll { .. }));
    let mut allocator = ShardAllocator::new(orders_schema(), 5);

    let err = allocator
        .allocate_slot(&mut engine)
        .expect_err("copy failure must surface");

    assert!(matches!(err, ShardError::Creation { ref shard, .. } if shard == "orders_1"));
    assert!(allocator.shard("orders_1").is_none());
    assert!(allocator.active().is_none());

    engine.clear_faults();
    let slot = allocator.allocate_slot(&mut engine).expect("retry allocates");
    assert_eq!(slot.key.shard, "orders_2");
}

#[test]
fn failed_reflection_registers_nothing() {
    let mut engine = orders_engine(1);
    engine.fail_reflect("orders_1");
    let mut allocator = ShardAllocator::new(orders_schema(), 5);

    allocator
        .new_shard(&mut engine)
        .expect_err("reflection failure must surface");

    assert_eq!(allocator.shards().count(), 1);
}

#[test]
fn new_shard_does_not_change_the_active_shard() {
    let mut engine = orders_engine(1);
    let mut allocator = ShardAllocator::new(orders_schema(), 5);
    allocator.allocate_slot(&mut engine).expect("allocate");

    let name = allocator.new_shard(&mut engine).expect("new shard").name().to_string();

    assert_eq!(name, "orders_2");
    assert_eq!(allocator.active().map(|s| s.name()), Some("orders_1"));
    assert!(engine.reflect("orders_2").is_ok());
}

#[test]
fn reserve_enforces_ceiling_on_derived_shards_only() {
    let mut engine = orders_engine(1);
    let mut allocator = ShardAllocator::new(orders_schema(), 1);
    allocator.allocate_slot(&mut engine).expect("allocate");

    let err = allocator.reserve("orders_1").expect_err("shard is full");
    assert!(matches!(err, ShardError::Full { ceiling: 1, .. }));

    // the base table is outside the ceiling and orders after its own columns
    assert_eq!(allocator.reserve(ORDERS).expect("base accepts"), 4);
    assert!(matches!(
        allocator.reserve("nope"),
        Err(ShardError::Unknown(_))
    ));
}
