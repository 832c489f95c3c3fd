use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub year: i32,
    pub director: Option<String>,
    pub plot: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub rating: Option<f64>,
    pub runtime: Option<i32>,
    /// JSON array of genre names.
    pub genres: String,
    /// JSON array of cast member names.
    pub cast: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::liked_movie::Entity")]
    LikedMovie,
    #[sea_orm(has_many = "super::watchlist_movie::Entity")]
    WatchlistMovie,
}

impl Related<super::liked_movie::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LikedMovie.def()
    }
}

impl Related<super::watchlist_movie::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WatchlistMovie.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
