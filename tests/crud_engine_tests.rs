mod common;

use common::{doc, image_body, memory_store, note_engine, seed, PlainNotes, CALLER};
use faceplay::query::{parse, QueryDescriptor, RawQuery, SortKey};
use faceplay::resource::{ImageResource, PersonResource, UserResource};
use faceplay::{CrudEngine, ErrorKind, NotFoundLevel};
use serde_json::{json, Value};

fn raw(pairs: &[(&str, &str)]) -> RawQuery {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn user_body(email: &str) -> Value {
    json!({
        "email": email,
        "password": "secret-pass",
        "firstName": "Ada",
        "lastName": "Lovelace"
    })
}

#[tokio::test]
async fn malformed_identifier_never_reaches_the_store() {
    let store = memory_store();
    let engine = CrudEngine::new(store.clone(), UserResource);

    for bad in ["", "abc", "685b7426961a92e9ec1d2a1", "685b7426961a92e9ec1d2a1z"] {
        let err = engine.find_one(bad, &QueryDescriptor::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadIdentifier);
        let err = engine.update(bad, doc(json!({"firstName": "x"}))).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadIdentifier);
        let err = engine.delete(bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadIdentifier);
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn create_assigns_id_and_equal_timestamps() {
    let store = memory_store();
    let engine = CrudEngine::new(store.clone(), UserResource);

    let created = engine
        .create(doc(json!({
            "_id": "685b7426961a92e9ec1d2a1d",
            "email": "  Ada@Example.COM ",
            "password": "secret-pass",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "createdAt": "2001-01-01T00:00:00Z"
        })))
        .await
        .unwrap();
    assert!(created.success);
    let user = created.data;
    assert_ne!(user.id, "685b7426961a92e9ec1d2a1d");
    assert_eq!(user.id.len(), 24);
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.created_at, user.updated_at);
    assert!(user.created_at.timestamp() > 978_307_200);
    assert_eq!(store.len("users"), 1);
}

#[tokio::test]
async fn update_never_inserts() {
    let store = memory_store();
    let engine = CrudEngine::new(store.clone(), UserResource);

    let err = engine
        .update("685b7426961a92e9ec1d2a1d", doc(json!({"firstName": "Grace"})))
        .await
        .unwrap_err();
    assert_eq!(err.not_found_level(), Some(NotFoundLevel::Record));
    assert!(store.is_empty("users"));
}

#[tokio::test]
async fn updated_at_strictly_increases_and_ignores_client_value() {
    let store = memory_store();
    let engine = CrudEngine::new(store.clone(), UserResource);
    let created = engine.create(doc(user_body("a@b.io"))).await.unwrap().data;

    let mut previous = created.updated_at;
    for name in ["Grace", "Barbara", "Edsger"] {
        let updated = engine
            .update(
                &created.id,
                doc(json!({"firstName": name, "updatedAt": "1999-01-01T00:00:00Z"})),
            )
            .await
            .unwrap()
            .data;
        assert_eq!(updated.first_name, name);
        assert!(updated.updated_at > previous);
        assert_eq!(updated.created_at, created.created_at);
        previous = updated.updated_at;
    }
}

#[tokio::test]
async fn update_is_a_shallow_merge() {
    let store = memory_store();
    let engine = CrudEngine::new(store.clone(), UserResource);
    let created = engine.create(doc(user_body("a@b.io"))).await.unwrap().data;

    let updated = engine
        .update(&created.id, doc(json!({"lastName": "Hopper"})))
        .await
        .unwrap()
        .data;
    assert_eq!(updated.first_name, "Ada");
    assert_eq!(updated.last_name, "Hopper");
    assert_eq!(updated.email, "a@b.io");
}

#[tokio::test]
async fn empty_collection_lists_as_empty_page() {
    let engine = CrudEngine::new(memory_store(), PersonResource);
    let envelope = engine.find(&QueryDescriptor::default()).await.unwrap();
    assert!(envelope.success);
    assert!(envelope.data.is_empty());
    assert_eq!(envelope.total, Some(0));
}

#[tokio::test]
async fn total_counts_all_matches_not_the_page() {
    let store = memory_store();
    for i in 0..25 {
        seed(&store, "persons", json!({"userId": CALLER, "name": format!("p{:02}", i)})).await;
    }
    seed(&store, "persons", json!({"userId": "someone-else", "name": "other"})).await;
    let engine = CrudEngine::new(store.clone(), PersonResource);

    let query = parse(&raw(&[("limit", "10"), ("page", "3"), ("sort", "name")]))
        .unwrap()
        .scoped_to("userId", CALLER);
    let envelope = engine.find(&query).await.unwrap();
    assert_eq!(envelope.total, Some(25));
    let names: Vec<&str> = envelope.data.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["p20", "p21", "p22", "p23", "p24"]);
}

#[tokio::test]
async fn limit_bounds_result_cardinality() {
    let store = memory_store();
    for i in 0..7 {
        seed(&store, "persons", json!({"userId": CALLER, "name": format!("n{}", i)})).await;
    }
    let engine = CrudEngine::new(store.clone(), PersonResource);

    for (limit, expected) in [("1", 1), ("5", 5), ("50", 7)] {
        let envelope = engine.find_raw(&raw(&[("limit", limit)])).await.unwrap();
        assert_eq!(envelope.data.len(), expected);
        assert_eq!(envelope.total, Some(7));
    }
}

#[tokio::test]
async fn where_and_sort_shape_results() {
    let store = memory_store();
    engine_seed_images(&store).await;
    let engine = CrudEngine::new(store.clone(), ImageResource);

    let envelope = engine
        .find_raw(&raw(&[
            ("where", r#"{"status":{"$in":["completed","error"]}}"#),
            ("sort", r#"{"fileKey":-1}"#),
        ]))
        .await
        .unwrap();
    let keys: Vec<&str> = envelope.data.iter().map(|i| i.file_key.as_str()).collect();
    assert_eq!(keys, vec!["c.jpg", "a.jpg"]);
    assert_eq!(envelope.total, Some(2));

    let mut query = QueryDescriptor::default();
    query.sort = vec![SortKey::asc("fileKey")];
    let all = engine.find(&query).await.unwrap();
    let keys: Vec<&str> = all.data.iter().map(|i| i.file_key.as_str()).collect();
    assert_eq!(keys, vec!["a.jpg", "b.jpg", "c.jpg"]);
}

async fn engine_seed_images(store: &faceplay::MemoryStore) {
    for (key, status) in [("a.jpg", "completed"), ("b.jpg", "uploaded"), ("c.jpg", "error")] {
        let mut body = image_body(key, json!([]));
        body["status"] = json!(status);
        seed(store, "images", body).await;
    }
}

#[tokio::test]
async fn malformed_where_is_a_syntax_error() {
    let store = memory_store();
    let engine = CrudEngine::new(store.clone(), PersonResource);
    for bad in [r#"{"name":"#, "[1,2]", r#"{"name":{"$near":1}}"#] {
        let err = engine.find_raw(&raw(&[("where", bad)])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadQuerySyntax, "where={}", bad);
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn delete_of_missing_record_changes_nothing() {
    let store = memory_store();
    seed(&store, "users", user_body("a@b.io")).await;
    let engine = CrudEngine::new(store.clone(), UserResource);

    let err = engine.delete("685b7426961a92e9ec1d2a1d").await.unwrap_err();
    assert_eq!(err.not_found_level(), Some(NotFoundLevel::Record));
    assert_eq!(store.len("users"), 1);
}

#[tokio::test]
async fn delete_returns_the_removed_id() {
    let store = memory_store();
    let id = seed(&store, "users", user_body("a@b.io")).await;
    let engine = CrudEngine::new(store.clone(), UserResource);

    let envelope = engine.delete(&id).await.unwrap();
    assert_eq!(envelope.data.id, id);
    assert!(store.is_empty("users"));
    let err = engine.find_one(&id, &QueryDescriptor::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn hook_failures_do_not_fail_the_operation() {
    let store = memory_store();
    let engine = note_engine(store.clone());

    let created = engine.create(doc(json!({"title": "draft"}))).await.unwrap();
    assert_eq!(created.data.title, "draft");
    let updated = engine
        .update(&created.data.id, doc(json!({"title": "final"})))
        .await
        .unwrap();
    assert_eq!(updated.data.title, "final");
    engine.delete(&created.data.id).await.unwrap();

    assert_eq!(engine.adapter().fired(), 3);
    assert!(store.is_empty("notes"));
    let deleted = engine.adapter().deleted();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].id, created.data.id);
    assert_eq!(deleted[0].title, "final");
}

#[tokio::test]
async fn unpaginated_lists_carry_no_total() {
    let store = memory_store();
    seed(&store, "notes", json!({"title": "a"})).await;
    seed(&store, "notes", json!({"title": "b"})).await;
    let engine = CrudEngine::new(store.clone(), PlainNotes);

    let envelope = engine.find(&QueryDescriptor::default()).await.unwrap();
    assert_eq!(envelope.data.len(), 2);
    assert_eq!(envelope.total, None);
    let body = serde_json::to_value(&envelope).unwrap();
    assert!(body.get("total").is_none());
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(store.calls(), 3);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let store = memory_store();
    let engine = CrudEngine::new(store.clone(), UserResource);

    let first = engine.create(doc(user_body("a@b.io"))).await.unwrap().data;
    let err = engine.create(doc(user_body("A@B.io"))).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(store.len("users"), 1);

    let second = engine.create(doc(user_body("c@d.io"))).await.unwrap().data;
    let err = engine
        .update(&second.id, doc(json!({"email": "a@b.io"})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let same = engine
        .update(&first.id, doc(json!({"email": "a@b.io", "firstName": "Grace"})))
        .await
        .unwrap()
        .data;
    assert_eq!(same.first_name, "Grace");
}

#[tokio::test]
async fn find_one_by_field_yields_null_data_when_absent() {
    let store = memory_store();
    seed(&store, "users", user_body("a@b.io")).await;
    let engine = CrudEngine::new(store.clone(), UserResource);

    let hit = engine
        .find_one_by_field("email", json!("a@b.io"), &QueryDescriptor::default())
        .await
        .unwrap();
    assert_eq!(hit.data.map(|u| u.email), Some("a@b.io".to_string()));

    let miss = engine
        .find_one_by_field("email", json!("nobody@b.io"), &QueryDescriptor::default())
        .await
        .unwrap();
    assert!(miss.success);
    assert!(miss.data.is_none());
}

#[tokio::test]
async fn owner_scope_hides_foreign_records() {
    let store = memory_store();
    let foreign = seed(&store, "persons", json!({"userId": "someone-else", "name": "x"})).await;
    let engine = CrudEngine::new(store.clone(), PersonResource);

    let scoped = QueryDescriptor::default().scoped_to("userId", CALLER);
    let err = engine.find_one(&foreign, &scoped).await.unwrap_err();
    assert_eq!(err.not_found_level(), Some(NotFoundLevel::Record));
    assert!(engine.find_one(&foreign, &QueryDescriptor::default()).await.is_ok());
}

#[tokio::test]
async fn validation_failures_are_reported_without_writing() {
    let store = memory_store();
    let engine = CrudEngine::new(store.clone(), UserResource);

    let err = engine
        .create(doc(json!({"email": "not-an-email", "password": "secret-pass", "firstName": "A", "lastName": "B"})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = engine
        .create(doc(json!({"email": "a@b.io", "password": "123", "firstName": "A", "lastName": "B"})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(store.is_empty("users"));

    let created = engine.create(doc(user_body("a@b.io"))).await.unwrap().data;
    let err = engine
        .update(&created.id, doc(json!({"firstName": null})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn projection_limits_returned_fields() {
    let store = memory_store();
    let id = seed(
        &store,
        "images",
        image_body("a.jpg", json!([{"milvusId": "m1", "bbox": [1, 2, 3, 4], "name": "f", "personId": null}])),
    )
    .await;
    let engine = CrudEngine::new(store.clone(), ImageResource);

    let query = parse(&raw(&[("select", "fileKey")])).unwrap();
    let image = engine.find_one(&id, &query).await.unwrap().data;
    assert_eq!(image.id, id);
    assert_eq!(image.file_key, "a.jpg");
    assert!(image.faces.is_empty());
    assert_eq!(image.playground_id, "");
}
