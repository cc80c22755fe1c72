use crate::{
    db::Predicate,
    model::{entity::EntityModel, field::EntityFieldKind},
    relation::{IndirectRelation, IndirectRelationField, IndirectRelationHook},
    test_support::field,
    traits::{EntityKind, Path},
    value::Value,
};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

const SUPPLIER_RELATION: EntityFieldKind = EntityFieldKind::IndirectRelation {
    target_path: Supplier::PATH,
    target_entity_name: Supplier::ENTITY_NAME,
};

///
/// Supplier
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Supplier {
    pub id: Ulid,
    pub name: String,
    pub location: String,
    pub starred: bool,
    pub points: u64,
}

impl Supplier {
    pub fn new(id: Ulid, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn starred(mut self) -> Self {
        self.starred = true;
        self
    }
}

static SUPPLIER_MODEL: EntityModel = EntityModel {
    path: Supplier::PATH,
    entity_name: Supplier::ENTITY_NAME,
    primary_key: "id",
    fields: &[
        field("id", EntityFieldKind::Ulid),
        field("name", EntityFieldKind::Text),
        field("location", EntityFieldKind::Text),
        field("starred", EntityFieldKind::Bool),
        field("points", EntityFieldKind::Uint),
    ],
};

impl Path for Supplier {
    const PATH: &'static str = "revrel_core::test_support::Supplier";
}

impl EntityKind for Supplier {
    type Key = Ulid;

    const ENTITY_NAME: &'static str = "supplier";
    const MODEL: &'static EntityModel = &SUPPLIER_MODEL;

    fn key(&self) -> Self::Key {
        self.id
    }

    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::Ulid(self.id)),
            "name" => Some(Value::from(self.name.as_str())),
            "location" => Some(Value::from(self.location.as_str())),
            "starred" => Some(Value::Bool(self.starred)),
            "points" => Some(Value::Uint(self.points)),
            _ => None,
        }
    }

    fn repr(&self) -> String {
        self.name.clone()
    }
}

///
/// Purchase
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Purchase {
    pub id: Ulid,
    pub placed_at: u64,
    pub supplier: IndirectRelation<Supplier>,
}

impl Purchase {
    pub fn new(id: Ulid) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

fn purchase_supplier(purchase: &Purchase) -> &IndirectRelation<Supplier> {
    &purchase.supplier
}

fn purchase_supplier_mut(purchase: &mut Purchase) -> &mut IndirectRelation<Supplier> {
    &mut purchase.supplier
}

pub static PURCHASE_SUPPLIER: IndirectRelationField<Purchase, Supplier> =
    IndirectRelationField::new("supplier", purchase_supplier, purchase_supplier_mut);

static PURCHASE_MODEL: EntityModel = EntityModel {
    path: Purchase::PATH,
    entity_name: Purchase::ENTITY_NAME,
    primary_key: "id",
    fields: &[
        field("id", EntityFieldKind::Ulid),
        field("placed_at", EntityFieldKind::Uint),
        field("supplier", SUPPLIER_RELATION),
    ],
};

impl Path for Purchase {
    const PATH: &'static str = "revrel_core::test_support::Purchase";
}

impl EntityKind for Purchase {
    type Key = Ulid;

    const ENTITY_NAME: &'static str = "purchase";
    const MODEL: &'static EntityModel = &PURCHASE_MODEL;

    fn key(&self) -> Self::Key {
        self.id
    }

    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::Ulid(self.id)),
            "placed_at" => Some(Value::Uint(self.placed_at)),
            "supplier" => Some(self.supplier.to_value()),
            _ => None,
        }
    }

    fn indirect_relations() -> Vec<&'static dyn IndirectRelationHook<Self>> {
        vec![&PURCHASE_SUPPLIER]
    }
}

///
/// StarredOrder
///
/// Required relation limited to starred suppliers, with an explicit
/// reverse name.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct StarredOrder {
    pub id: u64,
    pub supplier: IndirectRelation<Supplier>,
}

fn starred_order_supplier(order: &StarredOrder) -> &IndirectRelation<Supplier> {
    &order.supplier
}

fn starred_order_supplier_mut(order: &mut StarredOrder) -> &mut IndirectRelation<Supplier> {
    &mut order.supplier
}

fn only_starred() -> Predicate {
    Predicate::eq("starred", true)
}

pub static STARRED_ORDER_SUPPLIER: IndirectRelationField<StarredOrder, Supplier> =
    IndirectRelationField::new(
        "supplier",
        starred_order_supplier,
        starred_order_supplier_mut,
    )
    .related_name("starred_orders")
    .limit_choices_to(only_starred)
    .required();

static STARRED_ORDER_MODEL: EntityModel = EntityModel {
    path: StarredOrder::PATH,
    entity_name: StarredOrder::ENTITY_NAME,
    primary_key: "id",
    fields: &[
        field("id", EntityFieldKind::Uint),
        field("supplier", SUPPLIER_RELATION),
    ],
};

impl Path for StarredOrder {
    const PATH: &'static str = "revrel_core::test_support::StarredOrder";
}

impl EntityKind for StarredOrder {
    type Key = u64;

    const ENTITY_NAME: &'static str = "starred_order";
    const MODEL: &'static EntityModel = &STARRED_ORDER_MODEL;

    fn key(&self) -> Self::Key {
        self.id
    }

    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::Uint(self.id)),
            "supplier" => Some(self.supplier.to_value()),
            _ => None,
        }
    }

    fn indirect_relations() -> Vec<&'static dyn IndirectRelationHook<Self>> {
        vec![&STARRED_ORDER_SUPPLIER]
    }
}

///
/// Category
///
/// Declares an indirect relation whose model field is a plain text column,
/// so binding must fail.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Category {
    pub id: u64,
    pub supplier: IndirectRelation<Supplier>,
}

fn category_supplier(category: &Category) -> &IndirectRelation<Supplier> {
    &category.supplier
}

fn category_supplier_mut(category: &mut Category) -> &mut IndirectRelation<Supplier> {
    &mut category.supplier
}

pub static CATEGORY_SUPPLIER: IndirectRelationField<Category, Supplier> =
    IndirectRelationField::new("supplier", category_supplier, category_supplier_mut);

static CATEGORY_MODEL: EntityModel = EntityModel {
    path: Category::PATH,
    entity_name: Category::ENTITY_NAME,
    primary_key: "id",
    fields: &[
        field("id", EntityFieldKind::Uint),
        field("supplier", EntityFieldKind::Text),
    ],
};

impl Path for Category {
    const PATH: &'static str = "revrel_core::test_support::Category";
}

impl EntityKind for Category {
    type Key = u64;

    const ENTITY_NAME: &'static str = "category";
    const MODEL: &'static EntityModel = &CATEGORY_MODEL;

    fn key(&self) -> Self::Key {
        self.id
    }

    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::Uint(self.id)),
            "supplier" => Some(self.supplier.to_value()),
            _ => None,
        }
    }

    fn indirect_relations() -> Vec<&'static dyn IndirectRelationHook<Self>> {
        vec![&CATEGORY_SUPPLIER]
    }
}
