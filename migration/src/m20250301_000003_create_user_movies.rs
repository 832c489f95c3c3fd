use sea_orm_migration::{prelude::*, schema::*};

use crate::{m20250301_000001_create_movies::Movies, m20250301_000002_create_users::Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LikedMovies::Table)
                    .if_not_exists()
                    .col(string(LikedMovies::UserId))
                    .col(string(LikedMovies::MovieId))
                    .col(big_integer(LikedMovies::CreatedAt))
                    .primary_key(
                        Index::create().col(LikedMovies::UserId).col(LikedMovies::MovieId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_liked_movies_user")
                            .from(LikedMovies::Table, LikedMovies::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_liked_movies_movie")
                            .from(LikedMovies::Table, LikedMovies::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WatchlistMovies::Table)
                    .if_not_exists()
                    .col(string(WatchlistMovies::UserId))
                    .col(string(WatchlistMovies::MovieId))
                    .col(big_integer(WatchlistMovies::CreatedAt))
                    .primary_key(
                        Index::create()
                            .col(WatchlistMovies::UserId)
                            .col(WatchlistMovies::MovieId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_watchlist_movies_user")
                            .from(WatchlistMovies::Table, WatchlistMovies::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_watchlist_movies_movie")
                            .from(WatchlistMovies::Table, WatchlistMovies::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(WatchlistMovies::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(LikedMovies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum LikedMovies {
    Table,
    UserId,
    MovieId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WatchlistMovies {
    Table,
    UserId,
    MovieId,
    CreatedAt,
}
