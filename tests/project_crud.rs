//! Project CRUD over HTTP.

mod common;

use common::{client, drain_messages, login, spawn_hub, ADMIN_PASSWORD};

#[tokio::test]
async fn test_project_create_persists_and_redirects() {
    let hub = spawn_hub().await;
    let client = client();
    let token = login(&client, &hub.base, "admin", ADMIN_PASSWORD).await;

    let res = client
        .post(format!("{}/projects/new", hub.base))
        .bearer_auth(&token)
        .form(&[
            ("slug", "desktop"),
            ("name", "Desktop"),
            ("description", "The desktop project"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 303);
    assert_eq!(
        res.headers().get("location").unwrap().to_str().unwrap(),
        "/projects/desktop"
    );

    let detail = client
        .get(format!("{}/projects/desktop", hub.base))
        .send()
        .await
        .unwrap();
    assert_eq!(detail.status(), 200);
    let body = detail.text().await.unwrap();
    assert!(body.contains("Desktop"));
    assert!(body.contains("The desktop project"));
}

#[tokio::test]
async fn test_invalid_form_redisplays_without_persisting() {
    let hub = spawn_hub().await;
    let client = client();
    let token = login(&client, &hub.base, "admin", ADMIN_PASSWORD).await;

    let res = client
        .post(format!("{}/projects/new", hub.base))
        .bearer_auth(&token)
        .form(&[("slug", "Bad Slug!"), ("name", "")])
        .send()
        .await
        .unwrap();
    // The form page comes back with errors instead of a redirect.
    assert_eq!(res.status(), 200);
    let body = res.text().await.unwrap();
    assert!(body.contains("class=\"errors\""));
    assert!(body.contains("this field is required"));

    assert!(hub.store.list_projects().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mutations_require_login() {
    let hub = spawn_hub().await;
    let client = client();

    let res = client
        .post(format!("{}/projects/new", hub.base))
        .form(&[("slug", "desktop"), ("name", "Desktop")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
    assert!(hub.store.list_projects().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_changes_fields() {
    let hub = spawn_hub().await;
    let client = client();
    let token = login(&client, &hub.base, "admin", ADMIN_PASSWORD).await;

    client
        .post(format!("{}/projects/new", hub.base))
        .bearer_auth(&token)
        .form(&[("slug", "desktop"), ("name", "Desktop")])
        .send()
        .await
        .unwrap();

    let res = client
        .post(format!("{}/projects/desktop/edit", hub.base))
        .bearer_auth(&token)
        .form(&[("slug", "desktop"), ("name", "Desktop Environment")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 303);

    let project = hub.store.get_project("desktop").await.unwrap().unwrap();
    assert_eq!(project.name, "Desktop Environment");
}

#[tokio::test]
async fn test_delete_needs_post() {
    let hub = spawn_hub().await;
    let client = client();
    let token = login(&client, &hub.base, "admin", ADMIN_PASSWORD).await;

    client
        .post(format!("{}/projects/new", hub.base))
        .bearer_auth(&token)
        .form(&[("slug", "desktop"), ("name", "Desktop")])
        .send()
        .await
        .unwrap();

    // A GET only shows the confirmation page.
    let res = client
        .get(format!("{}/projects/desktop/delete", hub.base))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.text().await.unwrap().contains("Are you sure"));
    assert!(hub.store.get_project("desktop").await.unwrap().is_some());

    // The POST deletes and redirects to the project list.
    let res = client
        .post(format!("{}/projects/desktop/delete", hub.base))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 303);
    assert_eq!(
        res.headers().get("location").unwrap().to_str().unwrap(),
        "/projects"
    );
    assert!(hub.store.get_project("desktop").await.unwrap().is_none());

    let messages = drain_messages(&client, &hub.base, &token).await;
    assert!(messages.iter().any(|m| m.contains("was deleted")));
}

#[tokio::test]
async fn test_feeds_render() {
    let hub = spawn_hub().await;
    let client = client();
    let token = login(&client, &hub.base, "admin", ADMIN_PASSWORD).await;

    client
        .post(format!("{}/projects/new", hub.base))
        .bearer_auth(&token)
        .form(&[("slug", "desktop"), ("name", "Desktop")])
        .send()
        .await
        .unwrap();

    let rss = client
        .get(format!("{}/feed/rss", hub.base))
        .send()
        .await
        .unwrap();
    assert_eq!(rss.status(), 200);
    assert!(rss
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("application/rss+xml"));
    assert!(rss.text().await.unwrap().contains("Desktop"));

    let atom = client
        .get(format!("{}/projects/desktop/feed/atom", hub.base))
        .send()
        .await
        .unwrap();
    assert_eq!(atom.status(), 200);
    assert!(atom
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("application/atom+xml"));

    let unknown = client
        .get(format!("{}/feed/opml", hub.base))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 404);
}
