diesel::table! {
    products (id) {
        id -> Int4,
        title -> Varchar,
        description -> Text,
        price -> Float8,
        category -> Varchar,
        sizes -> Array<Text>,
        src_url -> Varchar,
        gallery -> Array<Text>,
        discount_amount -> Float8,
        discount_percentage -> Float8,
        rating -> Float8,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}
