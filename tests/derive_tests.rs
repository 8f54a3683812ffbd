/// Declaration surface tests
///
/// `#[derive(Composite)]` structs and the `declare_composite` factory.
/// Run with: cargo test --test derive_tests
use std::sync::Arc;

use chrono::NaiveTime;
use pgcomposite::{
    Composite, CompositeArgs, CompositeError, CompositeField, CompositeRegistry, CompositeType,
    DataType, DeclarationScope, MemoryDriver, Value, declaration_scope, declare_composite,
};

#[derive(Debug, Clone, PartialEq, Composite)]
#[composite(db_type = "time_boolean")]
struct TimeBoolean {
    time: NaiveTime,
    #[composite(default = true)]
    boolean: bool,
}

#[derive(Debug, Clone, PartialEq, Composite)]
#[composite(db_type = "labelled_point")]
struct LabelledPoint {
    x: i64,
    y: i64,
    #[composite(column = "caption")]
    label: Option<String>,
}

fn driver() -> Arc<MemoryDriver> {
    let driver = Arc::new(MemoryDriver::new());
    driver
        .execute("CREATE TYPE time_boolean AS (time time, boolean boolean)")
        .unwrap();
    driver
        .execute("CREATE TYPE labelled_point AS (x bigint, y bigint, caption text)")
        .unwrap();
    driver
}

#[test]
fn test_derived_descriptor() -> anyhow::Result<()> {
    let descriptor = TimeBoolean::descriptor()?;
    assert_eq!(TimeBoolean::DB_TYPE, "time_boolean");
    assert_eq!(descriptor.type_name(), "time_boolean");
    assert_eq!(descriptor.name(), Some("TimeBoolean"));
    assert_eq!(descriptor.module(), Some("derive_tests"));
    assert_eq!(descriptor.signature_string(), "time TIME, boolean BOOLEAN");

    let time = descriptor.field("time").unwrap();
    assert!(!time.has_default());
    let boolean = descriptor.field("boolean").unwrap();
    assert_eq!(boolean.get_default(), Some(Value::Boolean(true)));

    let point = LabelledPoint::descriptor()?;
    let label = point.field("label").unwrap();
    assert_eq!(label.storage_name(), "caption");
    assert!(label.is_nullable());
    assert_eq!(label.get_default(), Some(Value::Null));
    assert_eq!(point.field("x").unwrap().get_default(), Some(Value::Integer(0)));
    Ok(())
}

#[test]
fn test_declare_type_and_round_trip() -> anyhow::Result<()> {
    let registry = CompositeRegistry::new(driver());
    let declared = registry.declare_type::<TimeBoolean>()?;
    assert!(registry.is_registered("time_boolean"));
    assert_eq!(declared.column_type.label(), "TimeBooleanField");

    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
    let original = TimeBoolean {
        time: noon,
        boolean: false,
    };

    let value = registry.to_composite(original.clone())?;
    let literal = registry.adapt(&Value::Composite(value))?;
    assert_eq!(literal, "('12:00:00'::time,false)::time_boolean");

    let decoded: TimeBoolean = registry.decode_as("(12:00:00,f)")?;
    assert_eq!(decoded, original);
    Ok(())
}

#[test]
fn test_derived_defaults_apply_on_construct() -> anyhow::Result<()> {
    let registry = CompositeRegistry::new(driver());
    let declared = registry.declare_type::<TimeBoolean>()?;

    let value = declared.construct(
        CompositeArgs::new().named("time", NaiveTime::from_hms_opt(8, 30, 0).unwrap()),
    )?;
    let typed = TimeBoolean::from_composite(&value)?;
    assert!(typed.boolean);

    let err = declared.construct(CompositeArgs::new()).unwrap_err();
    assert!(matches!(err, CompositeError::MissingField { field, .. } if field == "time"));
    Ok(())
}

#[test]
fn test_optional_field_round_trip() -> anyhow::Result<()> {
    let registry = CompositeRegistry::new(driver());
    registry.declare_type::<LabelledPoint>()?;

    let point = LabelledPoint {
        x: 1,
        y: -2,
        label: None,
    };
    let value = registry.to_composite(point.clone())?;
    assert_eq!(
        registry.adapt(&Value::Composite(value))?,
        "(1,-2,NULL)::labelled_point"
    );

    assert_eq!(registry.decode_as::<LabelledPoint>("(1,-2,)")?, point);
    let named: LabelledPoint = registry.decode_as("(1,-2,\"home, sweet\")")?;
    assert_eq!(named.label.as_deref(), Some("home, sweet"));
    Ok(())
}

#[test]
fn test_declare_type_before_schema_exists() -> anyhow::Result<()> {
    let driver = Arc::new(MemoryDriver::new());
    let registry = CompositeRegistry::new(driver.clone());
    registry.declare_type::<TimeBoolean>()?;
    assert!(registry.is_pending("time_boolean"));

    driver.execute("CREATE TYPE time_boolean AS (time time, boolean boolean)")?;
    let value = registry.to_composite(TimeBoolean {
        time: NaiveTime::from_hms_opt(23, 59, 1).unwrap(),
        boolean: true,
    })?;
    assert!(registry.is_registered("time_boolean"));
    assert_eq!(value.type_name(), "time_boolean");
    Ok(())
}

#[test]
fn test_declare_composite_factory() -> anyhow::Result<()> {
    let driver = Arc::new(MemoryDriver::new());
    driver.execute("CREATE TYPE foo AS (time time)")?;
    let registry = CompositeRegistry::new(driver);

    let foo = declare_composite(
        &registry,
        &declaration_scope!()?,
        "Foo",
        "foo",
        vec![CompositeField::new("time", DataType::Time)],
    )?;

    assert_eq!(foo.descriptor.name(), Some("Foo"));
    assert_eq!(foo.descriptor.module(), Some("derive_tests"));
    assert_eq!(foo.column_type.label(), "FooField");
    assert!(registry.is_registered("foo"));

    let seven = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
    let value = foo.construct(CompositeArgs::positional([seven]))?;
    // a one-field row needs the explicit constructor
    assert_eq!(value.to_literal()?, "ROW('07:00:00'::time)::foo");
    assert_eq!(registry.adapt(&Value::Composite(value))?, "ROW('07:00:00'::time)::foo");
    Ok(())
}

#[test]
fn test_declare_composite_rejects_bad_input() {
    let registry = CompositeRegistry::new(Arc::new(MemoryDriver::new()));
    let scope = DeclarationScope::module("app::models").unwrap();

    let err = declare_composite(&registry, &scope, "Foo", "", vec![]).unwrap_err();
    assert_eq!(err, CompositeError::Configuration("db_type must be set".into()));

    let err = declare_composite(&registry, &scope, "not a name", "foo", vec![]).unwrap_err();
    assert!(matches!(err, CompositeError::Configuration(_)));

    let err = declare_composite(&registry, &scope, "Foo", "drop table;", vec![]).unwrap_err();
    assert!(matches!(err, CompositeError::Configuration(_)));

    assert!(matches!(
        DeclarationScope::module("app::run::{{closure}}"),
        Err(CompositeError::Configuration(_))
    ));
}
