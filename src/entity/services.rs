use sea_orm::entity::prelude::*;

use crate::models::ServiceCategory;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub starting_price: Option<Decimal>,
    pub image: Option<String>,
    pub category: ServiceCategory,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::walk_ins::Entity")]
    WalkIns,
}

impl Related<super::walk_ins::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalkIns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
