// Pinch schema - key/value storage tables for Diesel ORM

diesel::table! {
    schema_versions (id) {
        id -> Integer,
        version -> Text,
        name -> Text,
        features -> Text,
        introduced_at -> Text,
    }
}

diesel::table! {
    kv_store (key) {
        key -> Text,
        value -> Text,
        updated_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(schema_versions, kv_store,);
