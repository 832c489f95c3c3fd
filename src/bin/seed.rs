//! Replaces the `movies` table with a small sample catalogue.

use cinematch::{config::Config, db, entities::movie, genres::encode_names};
use sea_orm::{ActiveValue::Set, EntityTrait, TransactionTrait};

struct Sample {
    title: &'static str,
    year: i32,
    director: &'static str,
    plot: &'static str,
    rating: f64,
    runtime: i32,
    genres: &'static [&'static str],
    cast: &'static [&'static str],
}

const SAMPLES: &[Sample] = &[
    Sample {
        title: "Inception",
        year: 2010,
        director: "Christopher Nolan",
        plot: "A thief who steals corporate secrets through the use of dream-sharing technology is given the inverse task of planting an idea into the mind of a C.E.O.",
        rating: 8.8,
        runtime: 148,
        genres: &["Sci-Fi", "Action", "Thriller"],
        cast: &["Leonardo DiCaprio", "Joseph Gordon-Levitt", "Elliot Page"],
    },
    Sample {
        title: "The Matrix",
        year: 1999,
        director: "Lana Wachowski, Lilly Wachowski",
        plot: "A computer hacker learns from mysterious rebels about the true nature of his reality and his role in the war against its controllers.",
        rating: 8.7,
        runtime: 136,
        genres: &["Sci-Fi", "Action"],
        cast: &["Keanu Reeves", "Laurence Fishburne", "Carrie-Anne Moss"],
    },
    Sample {
        title: "Interstellar",
        year: 2014,
        director: "Christopher Nolan",
        plot: "A team of explorers travel through a wormhole in space in an attempt to ensure humanity's survival.",
        rating: 8.6,
        runtime: 169,
        genres: &["Sci-Fi", "Drama", "Adventure"],
        cast: &["Matthew McConaughey", "Anne Hathaway", "Jessica Chastain"],
    },
    Sample {
        title: "Arrival",
        year: 2016,
        director: "Denis Villeneuve",
        plot: "A linguist works with the military to communicate with alien lifeforms after twelve mysterious spacecraft appear around the world.",
        rating: 7.9,
        runtime: 116,
        genres: &["Sci-Fi", "Drama", "Mystery"],
        cast: &["Amy Adams", "Jeremy Renner", "Forest Whitaker"],
    },
    Sample {
        title: "Blade Runner 2049",
        year: 2017,
        director: "Denis Villeneuve",
        plot: "Young Blade Runner K's discovery of a long-buried secret leads him to track down former Blade Runner Rick Deckard, who's been missing for thirty years.",
        rating: 8.0,
        runtime: 164,
        genres: &["Sci-Fi", "Drama", "Mystery"],
        cast: &["Ryan Gosling", "Harrison Ford", "Ana de Armas"],
    },
    Sample {
        title: "Ex Machina",
        year: 2014,
        director: "Alex Garland",
        plot: "A young programmer is selected to participate in a ground-breaking experiment in synthetic intelligence by evaluating the human qualities of a highly advanced humanoid A.I.",
        rating: 7.7,
        runtime: 108,
        genres: &["Sci-Fi", "Drama", "Thriller"],
        cast: &["Alicia Vikander", "Domhnall Gleeson", "Oscar Isaac"],
    },
    Sample {
        title: "The Shawshank Redemption",
        year: 1994,
        director: "Frank Darabont",
        plot: "Two imprisoned men bond over a number of years, finding solace and eventual redemption through acts of common decency.",
        rating: 9.3,
        runtime: 142,
        genres: &["Drama"],
        cast: &["Tim Robbins", "Morgan Freeman", "Bob Gunton"],
    },
    Sample {
        title: "The Godfather",
        year: 1972,
        director: "Francis Ford Coppola",
        plot: "The aging patriarch of an organized crime dynasty transfers control of his clandestine empire to his reluctant son.",
        rating: 9.2,
        runtime: 175,
        genres: &["Crime", "Drama"],
        cast: &["Marlon Brando", "Al Pacino", "James Caan"],
    },
    Sample {
        title: "Pulp Fiction",
        year: 1994,
        director: "Quentin Tarantino",
        plot: "The lives of two mob hitmen, a boxer, a gangster and his wife, and a pair of diner bandits intertwine in four tales of violence and redemption.",
        rating: 8.9,
        runtime: 154,
        genres: &["Crime", "Drama"],
        cast: &["John Travolta", "Uma Thurman", "Samuel L. Jackson"],
    },
    Sample {
        title: "The Dark Knight",
        year: 2008,
        director: "Christopher Nolan",
        plot: "When the menace known as the Joker wreaks havoc and chaos on the people of Gotham, Batman must accept one of the greatest psychological and physical tests of his ability to fight injustice.",
        rating: 9.0,
        runtime: 152,
        genres: &["Action", "Crime", "Drama"],
        cast: &["Christian Bale", "Heath Ledger", "Aaron Eckhart"],
    },
];

fn to_model(sample: &Sample, now: i64) -> movie::ActiveModel {
    let names = |list: &[&str]| encode_names(&list.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    movie::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        title: Set(sample.title.to_string()),
        year: Set(sample.year),
        director: Set(Some(sample.director.to_string())),
        plot: Set(Some(sample.plot.to_string())),
        poster_url: Set(None),
        backdrop_url: Set(None),
        rating: Set(Some(sample.rating)),
        runtime: Set(Some(sample.runtime)),
        genres: Set(names(sample.genres)),
        cast: Set(names(sample.cast)),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sqlx=warn".to_string()))
        .init();

    let config = Config::from_env()?;
    let db = db::connect_and_migrate(&config.database_url).await?;

    let now = db::now_sec();
    let txn = db.begin().await?;

    let cleared = movie::Entity::delete_many().exec(&txn).await?;
    tracing::info!(rows = cleared.rows_affected, "cleared existing movies");

    movie::Entity::insert_many(SAMPLES.iter().map(|s| to_model(s, now))).exec_without_returning(&txn).await?;
    txn.commit().await?;

    tracing::info!(movies = SAMPLES.len(), "seeding completed");
    Ok(())
}
