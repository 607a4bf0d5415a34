use rowmirror::{
    ConditionMap, DbError, Mappable, MapperConfig, MappingContext, Order, RecordingEngine, Row,
    StorageEngine, Value,
};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct Player {
    #[mirror(primary)]
    id: i64,
    name: String,
    team: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct Note {
    text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct Account {
    #[mirror(unique)]
    email: String,
    nickname: Option<String>,
    balance: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
#[mirror(public, version = "B2")]
struct Setting {
    #[mirror(primary)]
    key: String,
    value: String,
}

fn recording_context() -> (Arc<RecordingEngine>, MappingContext) {
    let engine = Arc::new(RecordingEngine::new());
    let ctx = MappingContext::with_engine(engine.clone());
    (engine, ctx)
}

#[test]
fn insert_emits_present_columns_in_order() {
    let (engine, ctx) = recording_context();
    let kobe = Player {
        id: 24,
        name: "Kobe".to_string(),
        team: None,
    };

    ctx.insert(&[kobe], true).unwrap();

    let statements = engine.statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].sql.starts_with("CREATE TABLE IF NOT EXISTS player_A0 ("));
    assert_eq!(
        statements[1].sql,
        "INSERT OR REPLACE INTO player_A0 (id,name) VALUES (?,?)"
    );
    assert_eq!(
        statements[1].args,
        vec![Value::Integer(24), Value::Text("Kobe".into())]
    );
}

#[test]
fn insert_skips_create_when_table_exists() {
    let (engine, ctx) = recording_context();
    engine.add_table("player_A0");

    let players = vec![
        Player {
            id: 1,
            name: "a".into(),
            team: Some("LAL".into()),
        },
        Player {
            id: 2,
            name: "b".into(),
            team: None,
        },
    ];
    assert_eq!(ctx.insert(&players, false).unwrap(), 2);

    let statements = engine.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[0].sql,
        "INSERT OR IGNORE INTO player_A0 (id,name,team) VALUES (?,?,?)"
    );
    assert_eq!(
        statements[1].sql,
        "INSERT OR IGNORE INTO player_A0 (id,name) VALUES (?,?)"
    );
}

#[test]
fn create_table_renders_constraints() {
    let (engine, ctx) = recording_context();
    assert!(ctx.create_table::<Account>().unwrap());
    assert!(!ctx.create_table::<Account>().unwrap());

    let statements = engine.statements();
    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements[0].sql,
        "CREATE TABLE IF NOT EXISTS account_A0 (email TEXT UNIQUE NOT NULL DEFAULT '', \
         nickname TEXT, balance INTEGER NOT NULL DEFAULT 0)"
    );
}

#[test]
fn update_matches_on_key_columns() {
    let (engine, ctx) = recording_context();
    let player = Player {
        id: 8,
        name: "Bryant".into(),
        team: Some("LAL".into()),
    };

    ctx.update(&player).unwrap();

    let stmt = engine.last().unwrap();
    assert_eq!(stmt.sql, "UPDATE player_A0 SET name = ?, team = ? WHERE id = ?");
    assert_eq!(
        stmt.args,
        vec![
            Value::Text("Bryant".into()),
            Value::Text("LAL".into()),
            Value::Integer(8)
        ]
    );
}

#[test]
fn update_without_condition_or_assignments_makes_no_storage_call() {
    let (engine, ctx) = recording_context();

    let err = ctx.update(&Note { text: "hi".into() }).unwrap_err();
    assert!(matches!(err, DbError::StatementError(_)));

    let assignments = ConditionMap::new().with("name", "x");
    let err = ctx
        .update_where::<Player>(&ConditionMap::new(), &assignments)
        .unwrap_err();
    assert!(matches!(err, DbError::StatementError(_)));

    let condition = ConditionMap::new().with("id", 1i64);
    let err = ctx
        .update_where::<Player>(&condition, &ConditionMap::new())
        .unwrap_err();
    assert!(matches!(err, DbError::StatementError(_)));

    assert!(engine.statements().is_empty());
}

#[test]
fn update_where_rejects_unknown_columns() {
    let (engine, ctx) = recording_context();
    let condition = ConditionMap::new().with("id", 1i64);
    let assignments = ConditionMap::new().with("salary", 10i64);

    let err = ctx
        .update_where::<Player>(&condition, &assignments)
        .unwrap_err();
    assert!(err.is_pre_storage());
    assert!(engine.statements().is_empty());
}

#[test]
fn conditional_delete_requires_a_condition() {
    let (engine, ctx) = recording_context();

    let err = ctx.delete_where::<Player>(&ConditionMap::new()).unwrap_err();
    assert!(matches!(err, DbError::StatementError(_)));

    let err = ctx.delete(&Note { text: "no key".into() }).unwrap_err();
    assert!(matches!(err, DbError::StatementError(_)));
    assert!(engine.statements().is_empty());

    ctx.delete_all::<Player>().unwrap();
    assert_eq!(engine.last().unwrap().sql, "DELETE FROM player_A0");
}

#[test]
fn delete_uses_primary_then_unique_key() {
    let (engine, ctx) = recording_context();

    ctx.delete(&Player {
        id: 3,
        name: "c".into(),
        team: None,
    })
    .unwrap();
    let stmt = engine.last().unwrap();
    assert_eq!(stmt.sql, "DELETE FROM player_A0 WHERE id = ?");
    assert_eq!(stmt.args, vec![Value::Integer(3)]);

    ctx.delete(&Account {
        email: "a@b.c".into(),
        nickname: None,
        balance: 5,
    })
    .unwrap();
    let stmt = engine.last().unwrap();
    assert_eq!(stmt.sql, "DELETE FROM account_A0 WHERE email = ?");
}

#[test]
fn delete_many_is_all_or_nothing_before_storage() {
    let (engine, ctx) = recording_context();
    let notes = vec![Note { text: "a".into() }, Note { text: "b".into() }];

    assert!(ctx.delete_many(&notes).is_err());
    assert!(engine.statements().is_empty());
}

#[test]
fn select_reassembles_queued_rows() {
    let (engine, ctx) = recording_context();
    let mut row = Row::new();
    row.insert("id".into(), Value::Integer(24));
    row.insert("name".into(), Value::Text("Kobe".into()));
    row.insert("team".into(), Value::Null);
    engine.push_result(vec![row]);

    let condition = ConditionMap::new().with("name", "Kobe");
    let found: Option<Player> = ctx
        .select_one(Order::Descending, Some(&condition))
        .unwrap();

    assert_eq!(
        found,
        Some(Player {
            id: 24,
            name: "Kobe".into(),
            team: None,
        })
    );
    let stmt = engine.last().unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM player_A0 WHERE name = ? ORDER BY ROWID DESC LIMIT 1"
    );
}

#[test]
fn public_types_use_the_public_engine() {
    let public = Arc::new(RecordingEngine::new());
    let private = Arc::new(RecordingEngine::new());
    let ctx =
        MappingContext::with_engines(MapperConfig::default(), public.clone(), private.clone());

    ctx.insert(
        &[Setting {
            key: "theme".into(),
            value: "dark".into(),
        }],
        true,
    )
    .unwrap();
    ctx.delete_all::<Player>().unwrap();

    assert!(public.table_exists("setting_B2").unwrap());
    assert_eq!(public.statements().len(), 2);
    assert_eq!(private.statements().len(), 1);
    assert_eq!(private.last().unwrap().sql, "DELETE FROM player_A0");
}

#[test]
fn prepare_creates_each_table_once() {
    let (engine, ctx) = recording_context();
    let created = ctx
        .prepare(&[
            MappingContext::create_table::<Player>,
            MappingContext::create_table::<Account>,
            MappingContext::create_table::<Player>,
        ])
        .unwrap();

    assert_eq!(created, 2);
    assert_eq!(
        engine.list_tables().unwrap(),
        vec!["account_A0".to_string(), "player_A0".to_string()]
    );
}
