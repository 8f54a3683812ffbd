/// Composite value construction tests
///
/// Run with: cargo test --test construction_tests
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pgcomposite::{
    CompositeArgs, CompositeDescriptor, CompositeError, CompositeField, CompositeRegistry,
    DataType, MemoryDriver, Value,
};

fn registry_with(sql: &str) -> CompositeRegistry {
    let driver = Arc::new(MemoryDriver::new());
    driver.execute(sql).unwrap();
    CompositeRegistry::new(driver)
}

fn xy_descriptor() -> Arc<CompositeDescriptor> {
    Arc::new(
        CompositeDescriptor::builder("xy")
            .field(CompositeField::new("x", DataType::Integer).default_value(-1))
            .field(CompositeField::new("y", DataType::Integer).default_value(-2))
            .build()
            .unwrap(),
    )
}

#[test]
fn test_positional_then_keyword() -> anyhow::Result<()> {
    let registry = registry_with("CREATE TYPE xy AS (x bigint, y bigint)");
    let descriptor = xy_descriptor();

    let value = registry.construct(&descriptor, CompositeArgs::new().arg(10).named("y", 20))?;
    assert_eq!(value.get("x"), Some(&Value::Integer(10)));
    assert_eq!(value.get("y"), Some(&Value::Integer(20)));

    let value = registry.construct(&descriptor, CompositeArgs::new().named("y", 99))?;
    assert_eq!(value.get("x"), Some(&Value::Integer(-1)));
    assert_eq!(value.get("y"), Some(&Value::Integer(99)));
    Ok(())
}

#[test]
fn test_keyword_for_filled_slot_is_discarded() -> anyhow::Result<()> {
    let registry = registry_with("CREATE TYPE xy AS (x bigint, y bigint)");
    let value = registry.construct(
        &xy_descriptor(),
        CompositeArgs::positional([1, 2]).named("x", 100),
    )?;
    assert_eq!(value.values(), &[Value::Integer(1), Value::Integer(2)]);
    Ok(())
}

#[test]
fn test_empty_type_name_fails_before_registry() {
    let driver = Arc::new(MemoryDriver::new());
    let registry = CompositeRegistry::new(driver.clone());
    let descriptor = Arc::new(
        CompositeDescriptor::builder("")
            .field(CompositeField::new("x", DataType::Integer).default_value(0))
            .build()
            .unwrap(),
    );

    let err = registry
        .construct(&descriptor, CompositeArgs::new())
        .unwrap_err();
    assert_eq!(err, CompositeError::Configuration("db_type must be set".into()));
    assert_eq!(driver.stats().registration_attempts, 0);
}

#[test]
fn test_pending_type_still_missing_fails_at_use() {
    let driver = Arc::new(MemoryDriver::new());
    let registry = CompositeRegistry::new(driver);
    let declared = registry.declare((*xy_descriptor()).clone()).unwrap();

    let err = declared.construct(CompositeArgs::new()).unwrap_err();
    assert_eq!(err, CompositeError::SchemaMissing("xy".into()));
}

#[test]
fn test_required_field_without_value() {
    let registry = registry_with("CREATE TYPE slot AS (starts time, label text)");
    let descriptor = Arc::new(
        CompositeDescriptor::builder("slot")
            .field(CompositeField::new("starts", DataType::Time))
            .field(CompositeField::new("label", DataType::Text).default_value("free"))
            .build()
            .unwrap(),
    );

    let err = registry
        .construct(&descriptor, CompositeArgs::new().named("label", "busy"))
        .unwrap_err();
    assert_eq!(
        err,
        CompositeError::MissingField {
            type_name: "slot".into(),
            field: "starts".into(),
        }
    );
}

#[test]
fn test_defaults_only_evaluated_for_unset_fields() -> anyhow::Result<()> {
    let registry = registry_with("CREATE TYPE counter AS (n bigint)");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let descriptor = Arc::new(
        CompositeDescriptor::builder("counter")
            .field(CompositeField::new("n", DataType::Integer).default_with(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Value::Integer(0)
            }))
            .build()?,
    );

    registry.construct(&descriptor, CompositeArgs::positional([5]))?;
    registry.construct(&descriptor, CompositeArgs::new().named("n", 6))?;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let value = registry.construct(&descriptor, CompositeArgs::new())?;
    assert_eq!(value.get("n"), Some(&Value::Integer(0)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

fn owner_ref_descriptor() -> Arc<CompositeDescriptor> {
    Arc::new(
        CompositeDescriptor::builder("owner_ref")
            .field(
                CompositeField::new("owner", DataType::Integer)
                    .column("owner_id")
                    .default_value(0),
            )
            .field(CompositeField::new("label", DataType::Text).default_value(""))
            .build()
            .unwrap(),
    )
}

#[test]
fn test_leftover_keywords_reach_base_step() -> anyhow::Result<()> {
    let registry = registry_with("CREATE TYPE owner_ref AS (owner_id bigint, label text)");
    let descriptor = owner_ref_descriptor();

    let value = registry.construct(&descriptor, CompositeArgs::new().named("owner_id", 7))?;
    assert_eq!(value.get("owner"), Some(&Value::Integer(7)));

    let err = registry
        .construct(&descriptor, CompositeArgs::new().named("colour", "red"))
        .unwrap_err();
    assert!(matches!(
        err,
        CompositeError::UnexpectedArgument { argument, .. } if argument == "colour"
    ));
    Ok(())
}

#[test]
fn test_storage_name_keyword_loses_to_positional() -> anyhow::Result<()> {
    let registry = registry_with("CREATE TYPE owner_ref AS (owner_id bigint, label text)");
    let descriptor = owner_ref_descriptor();

    let value = registry.construct(
        &descriptor,
        CompositeArgs::positional([4]).named("owner_id", 5),
    )?;
    assert_eq!(value.get("owner"), Some(&Value::Integer(4)));
    assert_eq!(value.get("label"), Some(&Value::Text(String::new())));

    // the attribute-name keyword claims the slot first
    let value = registry.construct(
        &descriptor,
        CompositeArgs::new().named("owner", 8).named("owner_id", 9),
    )?;
    assert_eq!(value.get("owner"), Some(&Value::Integer(8)));
    Ok(())
}

#[test]
fn test_too_many_positional_values() {
    let registry = registry_with("CREATE TYPE xy AS (x bigint, y bigint)");
    let err = registry
        .construct(&xy_descriptor(), CompositeArgs::positional([1, 2, 3]))
        .unwrap_err();
    assert!(matches!(
        err,
        CompositeError::TooManyArguments { given: 3, expected: 2, .. }
    ));
}

#[test]
fn test_values_are_type_checked() -> anyhow::Result<()> {
    let registry = registry_with("CREATE TYPE measure AS (amount double precision, unit text)");
    let descriptor = Arc::new(
        CompositeDescriptor::builder("measure")
            .field(CompositeField::new("amount", DataType::Float))
            .field(CompositeField::new("unit", DataType::Text).nullable())
            .build()?,
    );

    // integers widen to float fields
    let mut value = registry.construct(&descriptor, CompositeArgs::positional([3]))?;
    assert_eq!(value.get("unit"), Some(&Value::Null));

    value.set("unit", "kg")?;
    assert!(matches!(value.set("amount", "heavy"), Err(CompositeError::TypeMismatch(_))));
    assert!(matches!(
        registry.construct(&descriptor, CompositeArgs::new().arg(true)),
        Err(CompositeError::TypeMismatch(_))
    ));
    Ok(())
}
