//! HTML page assembly.
//!
//! The hub serves a handful of plain pages (lists, forms, confirmation,
//! file view). They are small enough to assemble by hand; everything user
//! controlled goes through `escape`.

use crate::forms::FormError;
use crate::highlight::escape;
use crate::store::models::{Component, POFile, POFileLock, Project, Unit};

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n\
         <body>\n<h1>{}</h1>\n{}\n</body>\n</html>\n",
        escape(title),
        escape(title),
        body
    )
}

fn error_list(errors: &[FormError]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}: {}</li>", escape(&e.field), escape(&e.message)))
        .collect();
    format!("<ul class=\"errors\">{}</ul>", items)
}

fn text_input(name: &str, label: &str, value: &str) -> String {
    format!(
        "<p><label>{}</label> <input name=\"{}\" value=\"{}\"></p>",
        escape(label),
        name,
        escape(value)
    )
}

/// Project create/edit form.
pub fn project_form(
    action: &str,
    slug: &str,
    name: &str,
    description: &str,
    long_description: &str,
    homepage: &str,
    errors: &[FormError],
) -> String {
    let body = format!(
        "{}<form method=\"post\" action=\"{}\">{}{}{}{}{}\
         <p><button type=\"submit\">Save</button></p></form>",
        error_list(errors),
        action,
        text_input("slug", "Slug", slug),
        text_input("name", "Name", name),
        text_input("description", "Description", description),
        text_input("long_description", "Long description", long_description),
        text_input("homepage", "Homepage", homepage),
    );
    layout("Project", &body)
}

/// Component + unit create/edit form.
#[allow(clippy::too_many_arguments)]
pub fn component_form(
    action: &str,
    project: &Project,
    slug: &str,
    name: &str,
    description: &str,
    source_lang: &str,
    i18n_kind: &str,
    file_filter: &str,
    root: &str,
    kind: &str,
    branch: &str,
    web_url: &str,
    errors: &[FormError],
) -> String {
    let body = format!(
        "{}<form method=\"post\" action=\"{}\">\
         <fieldset><legend>Component</legend>{}{}{}{}{}{}</fieldset>\
         <fieldset><legend>Unit</legend>{}{}{}{}</fieldset>\
         <p><button type=\"submit\">Save</button></p></form>",
        error_list(errors),
        action,
        text_input("slug", "Slug", slug),
        text_input("name", "Name", name),
        text_input("description", "Description", description),
        text_input("source_lang", "Source language", source_lang),
        text_input("i18n_kind", "I18n kind (gettext|intltool)", i18n_kind),
        text_input("file_filter", "File filter", file_filter),
        text_input("root", "Checkout root", root),
        text_input("kind", "VCS kind (git|svn|hg|tar)", kind),
        text_input("branch", "Branch", branch),
        text_input("web_url", "Web URL", web_url),
    );
    layout(&format!("Component in {}", project.name), &body)
}

/// Delete confirmation page. Only the subsequent POST deletes.
pub fn confirm_delete(kind: &str, name: &str, action: &str) -> String {
    let body = format!(
        "<p>Are you sure you want to delete the {} \"{}\"?</p>\
         <form method=\"post\" action=\"{}\">\
         <button type=\"submit\">Yes, delete</button></form>",
        escape(kind),
        escape(name),
        action
    );
    layout(&format!("Delete {}", kind), &body)
}

/// Project list page.
pub fn project_list(projects: &[Project]) -> String {
    let items: String = projects
        .iter()
        .map(|p| {
            format!(
                "<li><a href=\"/projects/{}\">{}</a> — {}</li>",
                p.slug,
                escape(&p.name),
                escape(&p.description)
            )
        })
        .collect();
    layout("Projects", &format!("<ul>{}</ul>", items))
}

/// Project detail page with its components.
pub fn project_detail(project: &Project, components: &[Component]) -> String {
    let items: String = components
        .iter()
        .map(|c| {
            format!(
                "<li><a href=\"/projects/{}/components/{}\">{}</a></li>",
                project.slug,
                c.slug,
                escape(&c.name)
            )
        })
        .collect();
    let body = format!(
        "<p>{}</p><p>{}</p><h2>Components</h2><ul>{}</ul>",
        escape(&project.description),
        escape(&project.long_description),
        items
    );
    layout(&project.name, &body)
}

/// Component detail page with translation statistics and lock state.
pub fn component_detail(
    project: &Project,
    component: &Component,
    unit: Option<&Unit>,
    pofiles: &[(POFile, Option<POFileLock>)],
) -> String {
    let unit_line = match unit {
        Some(unit) => format!(
            "<p>Checkout: {} ({}, branch {})</p>",
            escape(&unit.root),
            unit.kind,
            escape(&unit.branch)
        ),
        None => String::new(),
    };
    let rows: String = pofiles
        .iter()
        .map(|(pofile, lock)| {
            let lang = pofile.language_name.as_deref().unwrap_or("unknown");
            let locked = match lock {
                Some(lock) => format!("locked by {}", escape(&lock.owner_username)),
                None => "unlocked".to_string(),
            };
            format!(
                "<tr><td><a href=\"/projects/{}/components/{}/view/{}\">{}</a></td>\
                 <td>{}</td><td>{}%</td><td>{}%</td><td>{}%</td><td>{}</td></tr>",
                project.slug,
                component.slug,
                pofile.filename,
                escape(&pofile.filename),
                escape(lang),
                pofile.trans_percent(),
                pofile.fuzzy_percent(),
                pofile.untrans_percent(),
                locked
            )
        })
        .collect();
    let body = format!(
        "<p>{}</p>{}<h2>Translations</h2>\
         <table><tr><th>File</th><th>Language</th><th>Translated</th>\
         <th>Fuzzy</th><th>Untranslated</th><th>Lock</th></tr>{}</table>",
        escape(&component.description),
        unit_line,
        rows
    );
    layout(&component.full_name(&project.slug), &body)
}

/// Highlighted file view, the `poview.html` equivalent.
pub fn file_view(title: &str, highlighted_body: &str, style: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title>\
         <style>\n{}</style></head>\n<body>\n<h1>{}</h1>\n{}\n</body>\n</html>\n",
        escape(title),
        style,
        escape(title),
        highlighted_body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn project() -> Project {
        Project {
            id: 1,
            slug: "desktop".into(),
            name: "Desktop <env>".into(),
            description: "d".into(),
            long_description: String::new(),
            homepage: None,
            enabled: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_project_list_escapes_names() {
        let html = project_list(&[project()]);
        assert!(html.contains("Desktop &lt;env&gt;"));
        assert!(!html.contains("Desktop <env>"));
    }

    #[test]
    fn test_form_errors_rendered() {
        let errors = vec![FormError {
            field: "slug".into(),
            message: "a project with this slug exists".into(),
        }];
        let html = project_form("/projects/new", "desktop", "", "", "", "", &errors);
        assert!(html.contains("class=\"errors\""));
        assert!(html.contains("a project with this slug exists"));
    }

    #[test]
    fn test_confirm_delete_posts_back() {
        let html = confirm_delete("project", "Desktop", "/projects/desktop/delete");
        assert!(html.contains("method=\"post\""));
        assert!(html.contains("/projects/desktop/delete"));
    }
}
