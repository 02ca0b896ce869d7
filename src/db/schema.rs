table! {
    follows (follower_id, followed_id) {
        follower_id -> Int4,
        followed_id -> Int4,
        created_at -> Timestamptz,
    }
}

table! {
    post_comments (id) {
        id -> Int4,
        user_id -> Int4,
        post_id -> Int4,
        comment -> Text,
        created_at -> Timestamptz,
    }
}

table! {
    post_likes (id) {
        id -> Int4,
        user_id -> Int4,
        post_id -> Int4,
    }
}

table! {
    posts (id) {
        id -> Int4,
        user_id -> Int4,
        title -> Text,
        description -> Text,
        created_at -> Timestamptz,
    }
}

table! {
    users (id) {
        id -> Int4,
        name -> Text,
        email -> Text,
        password -> Text,
        created_at -> Timestamptz,
    }
}

joinable!(post_comments -> posts (post_id));
joinable!(post_comments -> users (user_id));
joinable!(post_likes -> posts (post_id));
joinable!(post_likes -> users (user_id));
joinable!(posts -> users (user_id));

allow_tables_to_appear_in_same_query!(follows, post_comments, post_likes, posts, users,);
