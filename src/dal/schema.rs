diesel::table! {
    auths (id) {
        id -> Text,
        userid -> BigInt,
        expires -> Nullable<Timestamp>,
    }
}

diesel::table! {
    group_places (id) {
        id -> BigInt,
        group_id -> BigInt,
        place_id -> BigInt,
        created_by -> Nullable<BigInt>,
        place_type -> Text,
        nickname -> Text,
        description -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    memberships (id) {
        id -> BigInt,
        group_id -> BigInt,
        user_id -> BigInt,
        is_admin -> Bool,
        joined_at -> Timestamp,
    }
}

diesel::table! {
    places (id) {
        id -> BigInt,
        external_id -> Nullable<Text>,
        name -> Text,
        address -> Text,
        lat_e6 -> BigInt,
        lng_e6 -> BigInt,
        phone -> Text,
        url -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    recommendations (id) {
        id -> BigInt,
        link_id -> BigInt,
        user_id -> BigInt,
        created_at -> Timestamp,
    }
}

diesel::table! {
    travel_groups (id) {
        id -> BigInt,
        name -> Text,
        description -> Text,
        created_by -> Nullable<BigInt>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    users (id) {
        id -> BigInt,
        name -> Text,
    }
}

diesel::joinable!(auths -> users (userid));
diesel::joinable!(group_places -> places (place_id));
diesel::joinable!(group_places -> travel_groups (group_id));
diesel::joinable!(memberships -> travel_groups (group_id));
diesel::joinable!(memberships -> users (user_id));
diesel::joinable!(recommendations -> group_places (link_id));

diesel::allow_tables_to_appear_in_same_query!(
    auths,
    group_places,
    memberships,
    places,
    recommendations,
    travel_groups,
    users,
);
