//! Diesel schema definitions for the catalog tables.

diesel::table! {
    use diesel::sql_types::*;

    brand (id) {
        id -> Int8,
        name -> Text,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    category (id) {
        id -> Int8,
        name -> Text,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    product (id) {
        id -> Int8,
        title -> Text,
        images -> Jsonb,
        rating -> Float8,
        price -> Float8,
        brand_id -> Int8,
        category_id -> Int8,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    custom_order (id) {
        id -> Int8,
        user_id -> Int8,
        product_ids -> Array<Int8>,
        address -> Text,
        city -> Text,
        status -> Text,
        total_price -> Float8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    action_log (id) {
        id -> Int8,
        action -> Text,
        user_id -> Int8,
        product_title -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(product -> brand (brand_id));
diesel::joinable!(product -> category (category_id));

diesel::allow_tables_to_appear_in_same_query!(brand, category, product, custom_order, action_log);
