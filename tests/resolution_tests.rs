use rowmirror::core::Affinity;
use rowmirror::mapping::FieldKind;
use rowmirror::{
    ColumnTypeRegistry, DbError, FieldValue, KeyRegistry, Mappable, MappingContext,
    RecordingEngine, TypeTag, Value, flatten, unflatten,
};
use std::sync::{Arc, Barrier};
use std::thread;

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct Wallet {
    currency: String,
    cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
#[mirror(declare_with = "declare_member_keys")]
struct Member {
    id: i64,
    email: String,
    handle: String,
    wallet: Wallet,
    backup: Option<Wallet>,
    nickname: Option<String>,
}

fn declare_member_keys(_member: &Member, keys: &mut KeyRegistry) {
    keys.primary("id").unique("email").unique("handle");
}

/// A caller type with no built-in column mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Money(i64);

impl FieldKind for Money {
    fn type_tag() -> TypeTag {
        TypeTag::Opaque("Money")
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Present(Value::Integer(self.0))
    }

    fn from_value(value: &Value) -> rowmirror::Result<Self> {
        i64::from_value(value).map(Money)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct Invoice {
    #[mirror(primary)]
    number: i64,
    total: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
#[mirror(declare_with = "declare_wallet_primary")]
struct BadKeys {
    id: i64,
    wallet: Wallet,
}

fn declare_wallet_primary(_value: &BadKeys, keys: &mut KeyRegistry) {
    keys.primary("wallet");
}

fn context() -> MappingContext {
    MappingContext::with_engine(Arc::new(RecordingEngine::new()))
}

#[test]
fn declaration_routine_marks_root_fields() {
    let ctx = context();
    let list = ctx.attributes::<Member>().unwrap();

    let primary: Vec<&str> = list
        .iter()
        .filter(|a| a.is_primary)
        .map(|a| a.key.as_str())
        .collect();
    assert_eq!(primary, vec!["id"]);
    assert!(list.get("email").unwrap().is_unique);
    assert!(list.get("handle").unwrap().is_unique);
    assert!(!list.get("wallet$_currency").unwrap().is_unique);
    assert!(!list.get("wallet$_cents").unwrap().is_primary);
}

#[test]
fn affinity_and_null_ability_follow_declared_types() {
    let ctx = context();
    let list = ctx.attributes::<Member>().unwrap();

    let id = list.get("id").unwrap();
    assert_eq!(id.affinity, Some(Affinity::Integer));
    assert!(id.is_not_null);

    let nickname = list.get("nickname").unwrap();
    assert_eq!(nickname.affinity, Some(Affinity::Text));
    assert!(!nickname.is_not_null);
    assert_eq!(nickname.default_value, None);

    assert!(list.get("wallet$_cents").unwrap().is_not_null);
    assert!(!list.get("backup$_cents").unwrap().is_not_null);
}

#[test]
fn cold_and_warm_resolution_agree() {
    let ctx = context();
    let cold = ctx.resolver().resolve_uncached::<Member>().unwrap();
    let warm = ctx.attributes::<Member>().unwrap();
    let again = ctx.attributes::<Member>().unwrap();

    assert_eq!(cold, *warm);
    assert!(Arc::ptr_eq(&warm, &again));
    assert_eq!(ctx.cache().len().unwrap(), 1);
}

#[test]
fn concurrent_first_resolution_yields_one_list() {
    let ctx = Arc::new(context());
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ctx.attributes::<Member>().unwrap()
            })
        })
        .collect();

    let lists: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let cached = ctx.attributes::<Member>().unwrap();
    assert!(lists.iter().all(|list| Arc::ptr_eq(list, &cached)));
}

#[test]
fn unregistered_types_are_dropped_silently() {
    let ctx = context();
    let list = ctx.attributes::<Invoice>().unwrap();
    assert_eq!(list.keys(), vec!["number"]);

    let mut registry = ColumnTypeRegistry::standard();
    registry.register(TypeTag::Opaque("Money"), Affinity::Integer);
    let ctx = context().with_registry(registry);
    let list = ctx.attributes::<Invoice>().unwrap();
    assert_eq!(list.keys(), vec!["number", "total"]);
    assert_eq!(list.get("total").unwrap().affinity, Some(Affinity::Integer));
}

#[test]
fn composite_primary_key_is_a_resolution_error() {
    let ctx = context();
    let err = ctx.attributes::<BadKeys>().unwrap_err();
    assert!(matches!(err, DbError::ResolutionError(_)));
    assert!(!ctx.cache().contains("badkeys_A0").unwrap());
}

#[test]
fn describe_table_is_json() {
    let ctx = context();
    let json = ctx.describe_table::<Member>().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed["table"], "member_A0");
    assert_eq!(parsed["attributes"][0]["key"], "id");
    assert_eq!(parsed["attributes"][0]["affinity"], "Integer");
    assert_eq!(parsed["attributes"][0]["is_primary"], true);
}

#[test]
fn value_maps_flatten_and_restore() {
    let member = Member {
        id: 9,
        email: "m@x.io".into(),
        handle: "m".into(),
        wallet: Wallet {
            currency: "EUR".into(),
            cents: 1250,
        },
        backup: None,
        nickname: Some("em".into()),
    };

    let nested = member.to_value_map();
    let flat = flatten(&nested);
    assert_eq!(flat.get("wallet$_cents"), Some(&Value::Integer(1250)));
    assert_eq!(flat.get("backup"), Some(&Value::Null));

    let restored = Member::from_value_map(&unflatten(&flat).unwrap());
    assert_eq!(restored, member);
}
