//! Concrete mix recipes, keyed by mark.

use batchplant_core::ConcreteRecipe;

use crate::db::DbPool;
use crate::StorageError;

/// Inserts or replaces the recipe for a mark. A re-upload of the same mark
/// overwrites its quantities and reactivates it.
pub async fn upsert_recipe(pool: &DbPool, recipe: &ConcreteRecipe) -> Result<i64, StorageError> {
    let res = sqlx::query(
        r#"
        INSERT INTO concrete_recipes
            (mark, cement_kg, sand_t, crushed_stone_t, screening_t, water_l, additives_l, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, 1)
        ON CONFLICT(mark) DO UPDATE SET
            cement_kg = excluded.cement_kg,
            sand_t = excluded.sand_t,
            crushed_stone_t = excluded.crushed_stone_t,
            screening_t = excluded.screening_t,
            water_l = excluded.water_l,
            additives_l = excluded.additives_l,
            is_active = 1
        "#,
    )
    .bind(&recipe.mark)
    .bind(recipe.cement_kg)
    .bind(recipe.sand_t)
    .bind(recipe.crushed_stone_t)
    .bind(recipe.screening_t)
    .bind(recipe.water_l)
    .bind(recipe.additives_l)
    .execute(pool)
    .await?;
    Ok(res.last_insert_rowid())
}

pub async fn active_recipes(pool: &DbPool) -> Result<Vec<ConcreteRecipe>, StorageError> {
    let rows: Vec<(String, f64, f64, f64, f64, f64, f64)> = sqlx::query_as(
        r#"
        SELECT mark, cement_kg, sand_t, crushed_stone_t, screening_t, water_l, additives_l
        FROM concrete_recipes
        WHERE is_active = 1
        ORDER BY mark
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(
            |(mark, cement_kg, sand_t, crushed_stone_t, screening_t, water_l, additives_l)| {
                ConcreteRecipe {
                    mark,
                    cement_kg,
                    sand_t,
                    crushed_stone_t,
                    screening_t,
                    water_l,
                    additives_l,
                }
            },
        )
        .collect())
}

pub async fn deactivate_recipe(pool: &DbPool, mark: &str) -> Result<(), StorageError> {
    sqlx::query("UPDATE concrete_recipes SET is_active = 0 WHERE mark = ?")
        .bind(mark)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_db_in_memory;

    fn m300() -> ConcreteRecipe {
        ConcreteRecipe {
            mark: "М300".to_string(),
            cement_kg: 350.0,
            sand_t: 0.7,
            crushed_stone_t: 1.1,
            screening_t: 0.0,
            water_l: 180.0,
            additives_l: 2.5,
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_same_mark() {
        let pool = create_db_in_memory().await.unwrap();
        upsert_recipe(&pool, &m300()).await.unwrap();
        let mut updated = m300();
        updated.cement_kg = 380.0;
        upsert_recipe(&pool, &updated).await.unwrap();

        let recipes = active_recipes(&pool).await.unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].cement_kg, 380.0);
    }

    #[tokio::test]
    async fn deactivated_recipe_hidden() {
        let pool = create_db_in_memory().await.unwrap();
        upsert_recipe(&pool, &m300()).await.unwrap();
        deactivate_recipe(&pool, "М300").await.unwrap();
        assert!(active_recipes(&pool).await.unwrap().is_empty());

        // Re-upload reactivates.
        upsert_recipe(&pool, &m300()).await.unwrap();
        assert_eq!(active_recipes(&pool).await.unwrap().len(), 1);
    }
}
