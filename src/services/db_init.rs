use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

pub async fn ensure_indexes(db: &Database) -> Result<(), String> {
    // users: unique email and username
    {
        let col = db.collection::<mongodb::bson::Document>("users");

        let email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        col.create_index(email, None)
            .await
            .map_err(|e| e.to_string())?;

        let username = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        col.create_index(username, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // orders: history listing (user + placed_at desc) and status filters
    {
        let col = db.collection::<mongodb::bson::Document>("orders");

        let by_time = IndexModel::builder()
            .keys(doc! { "user_id": 1, "placed_at": -1 })
            .build();
        col.create_index(by_time, None)
            .await
            .map_err(|e| e.to_string())?;

        let by_status = IndexModel::builder()
            .keys(doc! { "user_id": 1, "status": 1 })
            .build();
        col.create_index(by_status, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    Ok(())
}
