//! Server-rendered admin panel.
//!
//! Every [`AdminModel`] gets list, details, create, edit and delete pages under
//! `/admin/{identity}`. Pages are askama templates under `templates/admin/`
//! with plain HTML forms; all persistence goes through
//! [`Crud`], so the panel sees the same conflict and not-found behavior as any
//! other caller.

use std::collections::HashMap;

use askama::Template;
use axum::{
    extract::Path,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use uuid::Uuid;

use crate::crud::{Crud, Record, Value};
use crate::db::DbSession;
use crate::error::{validation, AppError, AppResult, OptionExt};
use crate::models::{User, UserCreate, UserUpdate};
use crate::state::AppState;

/// A record type exposed in the admin panel.
pub trait AdminModel: Record + Sync {
    /// URL segment, e.g. `user` in `/admin/user/list`.
    const IDENTITY: &'static str;
    /// Human-readable name shown in headings.
    const NAME: &'static str;
    /// Columns rendered on the list page.
    const COLUMN_LIST: &'static [&'static str];
    /// Fields rendered on the create and edit forms.
    const FORM_FIELDS: &'static [&'static str];

    fn pk(&self) -> String;

    fn column_value(&self, column: &str) -> String;

    /// Parses a primary key taken from the URL.
    fn parse_pk(raw: &str) -> AppResult<Value>;

    fn create_from_form(form: &HashMap<String, String>) -> AppResult<Self::Create>;

    fn update_from_form(form: &HashMap<String, String>) -> AppResult<Self::Update>;
}

impl AdminModel for User {
    const IDENTITY: &'static str = "user";
    const NAME: &'static str = "User";
    const COLUMN_LIST: &'static [&'static str] = &["id", "name"];
    const FORM_FIELDS: &'static [&'static str] = &["name"];

    fn pk(&self) -> String {
        self.id.to_string()
    }

    fn column_value(&self, column: &str) -> String {
        match column {
            "id" => self.id.to_string(),
            "name" => self.name.clone(),
            _ => String::new(),
        }
    }

    fn parse_pk(raw: &str) -> AppResult<Value> {
        Uuid::parse_str(raw)
            .map(Value::from)
            .map_err(|e| AppError::BadRequest(format!("invalid user id '{}': {}", raw, e)))
    }

    fn create_from_form(form: &HashMap<String, String>) -> AppResult<UserCreate> {
        let name = validation::required_field(form, "name")?;
        validation::validate_text(name, "name")?;
        Ok(UserCreate::new(name))
    }

    fn update_from_form(form: &HashMap<String, String>) -> AppResult<UserUpdate> {
        let name = validation::optional_field(form, "name");
        if let Some(name) = name {
            validation::validate_text(name, "name")?;
        }
        Ok(UserUpdate { name: name.map(str::to_string) })
    }
}

/// A model entry on the admin index page.
struct ModelLink {
    name: &'static str,
    identity: &'static str,
}

fn registered() -> Vec<ModelLink> {
    vec![ModelLink { name: User::NAME, identity: User::IDENTITY }]
}

/// A label/value pair shown on the details page or as a form input.
struct Field {
    name: &'static str,
    value: String,
}

struct Row {
    pk: String,
    cells: Vec<String>,
}

#[derive(Template)]
#[template(path = "admin/index.html")]
struct IndexTemplate {
    title: &'static str,
    models: Vec<ModelLink>,
}

#[derive(Template)]
#[template(path = "admin/list.html")]
struct ListTemplate {
    title: String,
    identity: &'static str,
    name: &'static str,
    columns: Vec<&'static str>,
    rows: Vec<Row>,
}

#[derive(Template)]
#[template(path = "admin/details.html")]
struct DetailsTemplate {
    title: String,
    identity: &'static str,
    pk: String,
    fields: Vec<Field>,
}

#[derive(Template)]
#[template(path = "admin/form.html")]
struct FormTemplate {
    title: String,
    action: String,
    fields: Vec<Field>,
}

/// Renders an askama template into an HTML response.
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => AppError::Internal(anyhow::anyhow!("Failed to render template: {}", err)).into_response(),
        }
    }
}

pub fn router() -> Router<AppState> {
    let router = Router::new().route("/admin", get(index));
    mount::<User>(router)
}

fn mount<M: AdminModel>(router: Router<AppState>) -> Router<AppState> {
    let base = format!("/admin/{}", M::IDENTITY);
    router
        .route(&format!("{}/list", base), get(list::<M>))
        .route(&format!("{}/details/{{pk}}", base), get(details::<M>))
        .route(&format!("{}/create", base), get(create_form::<M>).post(create::<M>))
        .route(&format!("{}/edit/{{pk}}", base), get(edit_form::<M>).post(edit::<M>))
        .route(&format!("{}/delete/{{pk}}", base), post(delete::<M>))
}

async fn index() -> HtmlTemplate<IndexTemplate> {
    HtmlTemplate(IndexTemplate { title: "Admin", models: registered() })
}

async fn list<M: AdminModel>(mut session: DbSession) -> AppResult<HtmlTemplate<ListTemplate>> {
    let rows = Crud::<M>::get_all(session.conn())
        .await?
        .iter()
        .map(|record| Row {
            pk: record.pk(),
            cells: M::COLUMN_LIST.iter().map(|c| record.column_value(c)).collect(),
        })
        .collect();

    Ok(HtmlTemplate(ListTemplate {
        title: format!("{} list", M::NAME),
        identity: M::IDENTITY,
        name: M::NAME,
        columns: M::COLUMN_LIST.to_vec(),
        rows,
    }))
}

async fn details<M: AdminModel>(
    mut session: DbSession,
    Path(pk): Path<String>,
) -> AppResult<HtmlTemplate<DetailsTemplate>> {
    let record = Crud::<M>::get_one_by_id(session.conn(), M::parse_pk(&pk)?, None)
        .await?
        .ok_or_not_found(M::NAME)?;

    Ok(HtmlTemplate(DetailsTemplate {
        title: format!("{} details", M::NAME),
        identity: M::IDENTITY,
        pk: record.pk(),
        fields: fields_of(M::COLUMN_LIST, |c| record.column_value(c)),
    }))
}

async fn create_form<M: AdminModel>() -> HtmlTemplate<FormTemplate> {
    HtmlTemplate(FormTemplate {
        title: format!("New {}", M::NAME),
        action: format!("/admin/{}/create", M::IDENTITY),
        fields: fields_of(M::FORM_FIELDS, |_| String::new()),
    })
}

async fn create<M: AdminModel>(
    mut session: DbSession,
    Form(form): Form<HashMap<String, String>>,
) -> AppResult<Redirect> {
    let data = M::create_from_form(&form)?;
    let record = Crud::<M>::create(session.conn(), &data).await?;
    tracing::info!("Admin created {} {}", M::NAME, record.pk());
    Ok(Redirect::to(&format!("/admin/{}/details/{}", M::IDENTITY, record.pk())))
}

async fn edit_form<M: AdminModel>(
    mut session: DbSession,
    Path(pk): Path<String>,
) -> AppResult<HtmlTemplate<FormTemplate>> {
    let record = Crud::<M>::get_one_by_id(session.conn(), M::parse_pk(&pk)?, None)
        .await?
        .ok_or_not_found(M::NAME)?;

    Ok(HtmlTemplate(FormTemplate {
        title: format!("Edit {}", M::NAME),
        action: format!("/admin/{}/edit/{}", M::IDENTITY, record.pk()),
        fields: fields_of(M::FORM_FIELDS, |f| record.column_value(f)),
    }))
}

async fn edit<M: AdminModel>(
    mut session: DbSession,
    Path(pk): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> AppResult<Redirect> {
    let data = M::update_from_form(&form)?;
    let updated = Crud::<M>::update_by_id(session.conn(), &data, M::parse_pk(&pk)?, None).await?;
    let record = updated.into_iter().next().ok_or_not_found(M::NAME)?;
    Ok(Redirect::to(&format!("/admin/{}/details/{}", M::IDENTITY, record.pk())))
}

async fn delete<M: AdminModel>(mut session: DbSession, Path(pk): Path<String>) -> AppResult<Redirect> {
    let removed = Crud::<M>::remove_by_id(session.conn(), M::parse_pk(&pk)?, None).await?;
    if removed == 0 {
        return Err(AppError::NotFound(format!("{} not found", M::NAME)));
    }
    tracing::info!("Admin deleted {} {}", M::NAME, pk);
    Ok(Redirect::to(&format!("/admin/{}/list", M::IDENTITY)))
}

fn fields_of(names: &'static [&'static str], value_of: impl Fn(&str) -> String) -> Vec<Field> {
    names.iter().map(|&name| Field { name, value: value_of(name) }).collect()
}
