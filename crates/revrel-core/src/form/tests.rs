use crate::{
    db::Db,
    error::{ErrorOrigin, RelationErrorKind},
    form::{Choice, ChoiceSet, IndirectSelect},
    obs::metrics_report,
    test_support::{
        PURCHASE_SUPPLIER, Purchase, STARRED_ORDER_SUPPLIER, Supplier, registered_db, ulid,
    },
    traits::EntityKind,
    value::Value,
    version::VersionId,
};

fn seed(db: &Db) -> (Supplier, Supplier) {
    let mut star = Supplier::new(ulid(1), "Star & Co").starred();
    let mut plain = Supplier::new(ulid(2), "Plain");
    db.save(&mut star).expect("save");
    db.save(&mut plain).expect("save");

    (star, plain)
}

#[test]
fn choices_are_live_entities_never_snapshots() {
    let db = registered_db();
    let (star, mut plain) = seed(&db);

    let mut purchase = Purchase::new(ulid(10));
    PURCHASE_SUPPLIER
        .set(&mut purchase, Some(plain.clone()))
        .expect("assign");
    db.save(&mut purchase).expect("save");
    plain.name = "Plain Renamed".to_string();
    db.save(&mut plain).expect("rename");

    let choices = PURCHASE_SUPPLIER.form_field().choices(&db).expect("choices");

    assert_eq!(
        choices,
        ChoiceSet::from(vec![
            Choice {
                value: Value::Ulid(star.id),
                label: "Star & Co".to_string(),
            },
            Choice {
                value: Value::Ulid(plain.id),
                label: "Plain Renamed".to_string(),
            },
        ])
    );
    assert!(
        choices
            .values()
            .iter()
            .all(|value| value.as_version().is_none())
    );
}

#[test]
fn constrained_choices_follow_the_declared_predicate() {
    let db = registered_db();
    let (star, _) = seed(&db);

    let field = STARRED_ORDER_SUPPLIER.form_field();
    assert!(field.is_required());
    assert_eq!(
        field.choices(&db).expect("choices").values(),
        vec![Value::Ulid(star.id)]
    );
}

#[test]
fn empty_submission_depends_on_nullability() {
    let db = registered_db();
    seed(&db);

    let nullable = PURCHASE_SUPPLIER.form_field();
    assert!(nullable.clean(&db, None).expect("none").is_none());
    assert!(nullable.clean(&db, Some("  ")).expect("blank").is_none());

    let err = STARRED_ORDER_SUPPLIER
        .form_field()
        .clean(&db, Some(""))
        .expect_err("required");
    assert_eq!(err.relation_kind(), Some(RelationErrorKind::Validation));
    assert_eq!(err.origin, ErrorOrigin::Form);
}

#[test]
fn clean_returns_the_live_entity() {
    let db = registered_db();
    let (star, _) = seed(&db);

    let cleaned = PURCHASE_SUPPLIER
        .form_field()
        .clean(&db, Some(star.id.to_string().as_str()))
        .expect("clean")
        .expect("selected");
    assert_eq!(cleaned, star);
}

#[test]
fn rejected_submissions_name_the_target_and_value() {
    let db = registered_db();
    let (_, plain) = seed(&db);
    let field = STARRED_ORDER_SUPPLIER.form_field();

    let raw = plain.id.to_string();
    let err = field.clean(&db, Some(raw.as_str())).expect_err("not starred");
    assert_eq!(err.relation_kind(), Some(RelationErrorKind::Validation));
    assert!(err.message.contains(Supplier::ENTITY_NAME));
    assert!(err.message.contains(&raw));

    let err = field.clean(&db, Some("not-a-ulid")).expect_err("bad key");
    assert!(err.message.contains("not-a-ulid"));

    let missing = ulid(99).to_string();
    let err = PURCHASE_SUPPLIER
        .form_field()
        .clean(&db, Some(missing.as_str()))
        .expect_err("missing");
    assert!(err.message.contains(&missing));

    assert_eq!(metrics_report().counters.ops.validation_rejections, 3);
}

#[test]
fn field_validate_checks_live_rows_under_constraints() {
    let db = registered_db();
    let (star, plain) = seed(&db);

    assert_eq!(
        STARRED_ORDER_SUPPLIER.validate(&db, star.id).expect("star"),
        star
    );
    let err = STARRED_ORDER_SUPPLIER
        .validate(&db, plain.id)
        .expect_err("plain");
    assert_eq!(err.relation_kind(), Some(RelationErrorKind::Validation));

    assert_eq!(PURCHASE_SUPPLIER.validate(&db, plain.id).expect("plain"), plain);
}

#[test]
fn widget_preselects_the_logical_key_of_the_pointer() {
    let db = registered_db();
    let (star, _) = seed(&db);

    let mut purchase = Purchase::new(ulid(10));
    PURCHASE_SUPPLIER
        .set(&mut purchase, Some(star.clone()))
        .expect("assign");
    db.save(&mut purchase).expect("save");

    let field = PURCHASE_SUPPLIER.form_field();
    let pointer = PURCHASE_SUPPLIER.pointer(&purchase);
    assert_eq!(
        field.initial_value(&db, pointer).expect("initial"),
        Some(Value::Ulid(star.id))
    );
    assert_eq!(field.initial_value(&db, None).expect("none"), None);

    let html = field.render(&db, pointer).expect("render");
    assert!(html.starts_with("<select name=\"supplier\" id=\"id_supplier\">"));
    assert!(html.contains("<option value=\"\">---------</option>"));
    assert!(html.contains(&format!(
        "<option value=\"{}\" selected>Star &amp; Co</option>",
        star.id
    )));
    assert!(html.ends_with("</select>"));
}

#[test]
fn widget_rejects_dangling_pointers() {
    let db = registered_db();

    let err = IndirectSelect::new("supplier")
        .format_value::<Supplier>(&db, Some(VersionId::new(42)))
        .expect_err("dangling");
    assert_eq!(err.relation_kind(), Some(RelationErrorKind::Resolution));
}

#[test]
fn required_render_omits_the_blank_option() {
    let db = registered_db();
    seed(&db);

    let html = STARRED_ORDER_SUPPLIER
        .form_field()
        .render(&db, None)
        .expect("render");
    assert!(!html.contains("---------"));
    assert_eq!(html.matches("<option").count(), 1);
}
