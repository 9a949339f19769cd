// Import diesel table macros
use diesel::{allow_tables_to_appear_in_same_query, joinable, table};

// Users are managed by an external identity service; the table exists
// only as a foreign-key target.
table! {
    users (id) {
        id -> Integer,
        username -> Varchar,
        email -> Varchar,
        created_at -> Timestamp,
    }
}

// Reference catalog of countries, populated out of band
table! {
    countries (id) {
        id -> Integer,
        name -> Varchar,
        iso_code -> Varchar,
    }
}

table! {
    trips (id) {
        id -> Integer,
        user_id -> Integer,
        country_id -> Integer,
        name -> Varchar,
        description -> Text,
        start_date -> Date,
        end_date -> Date,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

// One map per user; counters are derived from map_countries
table! {
    maps (id) {
        id -> Integer,
        user_id -> Integer,
        countries_visited -> Integer,
        percent_world_visited -> Double,
        map_image_url -> Nullable<Varchar>,
        last_updated -> Timestamp,
    }
}

// Visited-country ledger: one row per (map, country) pair ever visited
table! {
    map_countries (id) {
        id -> Integer,
        map_id -> Integer,
        country_id -> Integer,
        visit_count -> Integer,
        first_visited -> Timestamp,
        last_visit -> Timestamp,
    }
}

joinable!(trips -> users (user_id));
joinable!(trips -> countries (country_id));
joinable!(maps -> users (user_id));
joinable!(map_countries -> maps (map_id));
joinable!(map_countries -> countries (country_id));

allow_tables_to_appear_in_same_query!(
    users,
    countries,
    trips,
    maps,
    map_countries,
);
