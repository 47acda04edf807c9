//! Translation file serving, upload submission and lock toggling.

mod common;

use common::{client, drain_messages, login, spawn_hub, ADMIN_PASSWORD};
use transhub::store::models::{Component, I18nKind, VcsKind};
use transhub::store::repository::{ComponentData, POFileStats, ProjectData, UnitData};

const DE_PO: &str = "msgid \"\"\nmsgstr \"\"\n\nmsgid \"Hello\"\nmsgstr \"Hallo\"\n\nmsgid \"Bye\"\nmsgstr \"\"\n";
const DE_PO_COMPLETE: &str = "msgid \"\"\nmsgstr \"\"\n\nmsgid \"Hello\"\nmsgstr \"Hallo\"\n\nmsgid \"Bye\"\nmsgstr \"Tschuss\"\n";

/// Seed a project + component + pofile row directly through the store.
async fn seed_component(hub: &common::TestHub) -> Component {
    let project = hub
        .store
        .create_project(ProjectData {
            slug: "desktop".into(),
            name: "Desktop".into(),
            description: String::new(),
            long_description: String::new(),
            homepage: None,
        })
        .await
        .unwrap();
    let component = hub
        .store
        .create_component(
            project.id,
            ComponentData {
                slug: "ui".into(),
                name: "User Interface".into(),
                description: String::new(),
                source_lang: "en".into(),
                i18n_kind: I18nKind::Gettext,
                file_filter: r"po/.*\.po$".into(),
            },
            UnitData {
                name: "desktop.ui".into(),
                root: String::new(),
                kind: VcsKind::Git,
                branch: String::new(),
                web_url: None,
            },
        )
        .await
        .unwrap();
    hub.store
        .upsert_pofile(
            component.id,
            "po/de.po",
            Some("de".into()),
            Some("German".into()),
            POFileStats {
                total: 2,
                translated: 1,
                fuzzy: 0,
                untranslated: 1,
            },
        )
        .await
        .unwrap();
    component
}

fn write_working_copy(hub: &common::TestHub, content: &str) {
    let path = hub.repo_root.join("desktop/ui/po/de.po");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let hub = spawn_hub().await;
    let client = client();
    seed_component(&hub).await;

    let res = client
        .get(format!(
            "{}/projects/desktop/components/ui/raw/po/missing.po",
            hub.base
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_raw_download_has_attachment_headers() {
    let hub = spawn_hub().await;
    let client = client();
    seed_component(&hub).await;
    write_working_copy(&hub, DE_PO);

    let res = client
        .get(format!(
            "{}/projects/desktop/components/ui/raw/po/de.po",
            hub.base
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let disposition = res
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("desktop.ui.de.po"));
    assert!(res.text().await.unwrap().contains("msgid \"Hello\""));
}

#[tokio::test]
async fn test_view_is_highlighted_html() {
    let hub = spawn_hub().await;
    let client = client();
    seed_component(&hub).await;
    write_working_copy(&hub, DE_PO);

    let res = client
        .get(format!(
            "{}/projects/desktop/components/ui/view/po/de.po",
            hub.base
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body = res.text().await.unwrap();
    assert!(body.contains("<span class=\"k\">msgid</span>"));
    assert!(body.contains("desktop.ui: de.po"));
}

#[tokio::test]
async fn test_upload_without_file_field_messages_and_redirects() {
    let hub = spawn_hub().await;
    let client = client();
    let token = login(&client, &hub.base, "admin", ADMIN_PASSWORD).await;
    seed_component(&hub).await;

    let form = reqwest::multipart::Form::new().text("comment", "no file here");
    let res = client
        .post(format!(
            "{}/projects/desktop/components/ui/submit/po/de.po",
            hub.base
        ))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 303);

    let messages = drain_messages(&client, &hub.base, &token).await;
    assert!(messages.iter().any(|m| m.contains("Please select a file")));
}

#[tokio::test]
async fn test_upload_happy_path_updates_stats() {
    let hub = spawn_hub().await;
    let client = client();
    let token = login(&client, &hub.base, "admin", ADMIN_PASSWORD).await;
    let component = seed_component(&hub).await;
    write_working_copy(&hub, DE_PO);

    let part = reqwest::multipart::Part::bytes(DE_PO_COMPLETE.as_bytes().to_vec())
        .file_name("de.po");
    let form = reqwest::multipart::Form::new().part("file", part);

    let res = client
        .post(format!(
            "{}/projects/desktop/components/ui/submit/po/de.po",
            hub.base
        ))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 303);

    let messages = drain_messages(&client, &hub.base, &token).await;
    assert!(messages
        .iter()
        .any(|m| m.contains("File submitted successfully: po/de.po")));

    // The working copy holds the uploaded rendition and stats were
    // recomputed for German.
    let on_disk = std::fs::read_to_string(hub.repo_root.join("desktop/ui/po/de.po")).unwrap();
    assert!(on_disk.contains("Tschuss"));

    let pofile = hub
        .store
        .get_pofile(component.id, "po/de.po")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pofile.translated, 2);
    assert_eq!(pofile.untranslated, 0);
}

#[tokio::test]
async fn test_upload_of_garbage_reports_generic_failure() {
    let hub = spawn_hub().await;
    let client = client();
    let token = login(&client, &hub.base, "admin", ADMIN_PASSWORD).await;
    let component = seed_component(&hub).await;
    write_working_copy(&hub, DE_PO);

    let part = reqwest::multipart::Part::bytes(b"not a po file at all".to_vec())
        .file_name("de.po");
    let form = reqwest::multipart::Form::new().part("file", part);

    let res = client
        .post(format!(
            "{}/projects/desktop/components/ui/submit/po/de.po",
            hub.base
        ))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    // Still a redirect; the failure shows up as a message.
    assert_eq!(res.status(), 303);

    let messages = drain_messages(&client, &hub.base, &token).await;
    assert!(messages
        .iter()
        .any(|m| m.contains("an error is causing troubles")));

    // Stats untouched.
    let pofile = hub
        .store
        .get_pofile(component.id, "po/de.po")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pofile.translated, 1);
}

#[tokio::test]
async fn test_lock_toggle_three_way() {
    let hub = spawn_hub().await;
    let client = client();
    let component = seed_component(&hub).await;

    hub.store.ensure_user("bob", "pw", false).await.unwrap();
    let admin_token = login(&client, &hub.base, "admin", ADMIN_PASSWORD).await;
    let bob_token = login(&client, &hub.base, "bob", "pw").await;

    let lock_url = format!(
        "{}/projects/desktop/components/ui/lock/po/de.po",
        hub.base
    );
    let pofile = hub
        .store
        .get_pofile(component.id, "po/de.po")
        .await
        .unwrap()
        .unwrap();

    // No lock: bob's toggle creates one.
    let res = client
        .post(&lock_url)
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 303);
    let lock = hub.store.get_lock(pofile.id).await.unwrap().unwrap();
    assert_eq!(lock.owner_username, "bob");
    let messages = drain_messages(&client, &hub.base, &bob_token).await;
    assert!(messages.iter().any(|m| m.contains("Lock created")));

    // Someone else's toggle changes nothing.
    let res = client
        .post(&lock_url)
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 303);
    assert!(hub.store.get_lock(pofile.id).await.unwrap().is_some());
    let messages = drain_messages(&client, &hub.base, &admin_token).await;
    assert!(messages
        .iter()
        .any(|m| m.contains("Only the owner of a lock can remove it")));

    // The owner's toggle removes it.
    let res = client
        .post(&lock_url)
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 303);
    assert!(hub.store.get_lock(pofile.id).await.unwrap().is_none());
    let messages = drain_messages(&client, &hub.base, &bob_token).await;
    assert!(messages.iter().any(|m| m.contains("Lock removed.")));
}

#[tokio::test]
async fn test_admin_endpoints_require_admin() {
    let hub = spawn_hub().await;
    let client = client();
    seed_component(&hub).await;

    hub.store.ensure_user("bob", "pw", false).await.unwrap();
    let bob_token = login(&client, &hub.base, "bob", "pw").await;
    let admin_token = login(&client, &hub.base, "admin", ADMIN_PASSWORD).await;

    let res = client
        .get(format!("{}/admin/stats", hub.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let res = client
        .get(format!("{}/admin/stats", hub.base))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let res = client
        .get(format!("{}/admin/stats", hub.base))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["projects"], 1);
    assert_eq!(body["components"], 1);
}
