use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(string(Movies::Id).primary_key())
                    .col(string(Movies::Title))
                    .col(integer(Movies::Year))
                    .col(string_null(Movies::Director))
                    .col(text_null(Movies::Plot))
                    .col(string_null(Movies::PosterUrl))
                    .col(string_null(Movies::BackdropUrl))
                    .col(double_null(Movies::Rating))
                    .col(integer_null(Movies::Runtime))
                    .col(text(Movies::Genres).default("[]"))
                    .col(text(Movies::Cast).default("[]"))
                    .col(big_integer(Movies::CreatedAt))
                    .col(big_integer(Movies::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_rating")
                    .table(Movies::Table)
                    .col(Movies::Rating)
                    .to_owned(),
            )
            .await?;

        // Poster catalogue is loaded out of band; created here so a fresh
        // database has the shape the raw queries expect.
        manager
            .create_table(
                Table::create()
                    .table(MoviePosters::Table)
                    .if_not_exists()
                    .col(pk_auto(MoviePosters::RowIdx))
                    .col(integer_null(MoviePosters::IdTmdb))
                    .col(string(MoviePosters::Title))
                    .col(string_null(MoviePosters::ReleaseDate))
                    .col(text_null(MoviePosters::Overview))
                    .col(integer_null(MoviePosters::RuntimeMin))
                    .col(text_null(MoviePosters::Genres))
                    .col(blob_null(MoviePosters::PosterJpeg))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_posters_title")
                    .table(MoviePosters::Table)
                    .col(MoviePosters::Title)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MoviePosters::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Movies {
    Table,
    Id,
    Title,
    Year,
    Director,
    Plot,
    PosterUrl,
    BackdropUrl,
    Rating,
    Runtime,
    Genres,
    Cast,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MoviePosters {
    Table,
    RowIdx,
    IdTmdb,
    Title,
    ReleaseDate,
    Overview,
    RuntimeMin,
    Genres,
    PosterJpeg,
}
