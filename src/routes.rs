use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::{delete, get, patch, post, put, web, HttpResponse, HttpResponseBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::schemas::{Expense, Group, Lang, Member, MemberId, SettlementRecord};
use crate::store::GroupStore;
use crate::validation::{
    is_non_empty, parse_iso_date, validate_expense, validate_group, validate_settlement,
    AmountInput, ValidationError, MAX_TEXT_LEN,
};

#[derive(Deserialize, Serialize, Default)]
pub struct NewGroupJson {
    pub name: Option<String>,
    pub lang: Option<Lang>,
}

#[derive(Deserialize, Serialize)]
pub struct NewMemberJson {
    pub name: String,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatusJson {
    pub is_active: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpenseJson {
    pub description: String,
    pub amount: AmountInput,
    pub paid_by: MemberId,
    #[serde(default)]
    pub participants: Vec<MemberId>,
    pub date: String,
}

#[derive(Deserialize)]
pub struct NewSettlementJson {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: AmountInput,
    pub date: String,
}

fn no_store(mut response: HttpResponseBuilder) -> HttpResponseBuilder {
    response.insert_header(CacheControl(vec![CacheDirective::NoStore]));
    response
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn new_group(json: NewGroupJson, now: DateTime<Utc>) -> Group {
    let name = json
        .name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "New Group".to_string());
    Group::new(new_id(), name, json.lang.unwrap_or_default(), now)
}

/// Copies the client-editable parts of `incoming` over `stored`.
///
/// `incoming.version` is the version the client read; anything else means the
/// client is editing a stale copy.
pub fn apply_snapshot(stored: &mut Group, incoming: Group) -> Result<(), ApiError> {
    if incoming.version != stored.version {
        return Err(ApiError::Conflict {
            current_version: stored.version,
        });
    }
    validate_group(&incoming)?;
    stored.name = incoming.name;
    stored.lang = incoming.lang;
    stored.members = incoming.members;
    stored.expenses = incoming.expenses;
    stored.settlements = incoming.settlements;
    Ok(())
}

pub fn add_member(group: &mut Group, json: NewMemberJson, now: DateTime<Utc>) -> Result<Member, ApiError> {
    let name = json.name.trim();
    if !is_non_empty(name, MAX_TEXT_LEN) {
        return Err(ValidationError::Text("name").into());
    }
    let member = Member {
        id: new_id(),
        name: name.to_owned(),
        added_at: now,
        is_active: true,
    };
    group.members.push(member.clone());
    Ok(member)
}

/// Soft removal: the member keeps their history and balance.
pub fn set_member_active(group: &mut Group, member_id: &str, is_active: bool) -> Result<Member, ApiError> {
    let member = group
        .members
        .iter_mut()
        .find(|member| member.id == member_id)
        .ok_or_else(|| ApiError::NotFound {
            kind: "member",
            id: member_id.to_owned(),
        })?;
    member.is_active = is_active;
    Ok(member.clone())
}

pub fn add_expense(group: &mut Group, json: NewExpenseJson, now: DateTime<Utc>) -> Result<Expense, ApiError> {
    let expense = Expense {
        id: new_id(),
        description: json.description.trim().to_owned(),
        amount: json.amount.resolve()?,
        paid_by: json.paid_by,
        participants: json.participants,
        date: parse_iso_date(&json.date)?,
        created_at: now,
    };
    validate_expense(group, &expense)?;
    group.expenses.push(expense.clone());
    Ok(expense)
}

pub fn add_settlement(
    group: &mut Group,
    json: NewSettlementJson,
    now: DateTime<Utc>,
) -> Result<SettlementRecord, ApiError> {
    let record = SettlementRecord {
        id: new_id(),
        from: json.from,
        to: json.to,
        amount: json.amount.resolve()?,
        date: parse_iso_date(&json.date)?,
        created_at: now,
    };
    validate_settlement(group, &record)?;
    group.settlements.push(record.clone());
    Ok(record)
}

pub fn remove_expense(group: &mut Group, expense_id: &str) -> Result<(), ApiError> {
    let before = group.expenses.len();
    group.expenses.retain(|expense| expense.id != expense_id);
    if group.expenses.len() == before {
        return Err(ApiError::NotFound {
            kind: "expense",
            id: expense_id.to_owned(),
        });
    }
    Ok(())
}

pub fn remove_settlement(group: &mut Group, settlement_id: &str) -> Result<(), ApiError> {
    let before = group.settlements.len();
    group.settlements.retain(|record| record.id != settlement_id);
    if group.settlements.len() == before {
        return Err(ApiError::NotFound {
            kind: "settlement",
            id: settlement_id.to_owned(),
        });
    }
    Ok(())
}

#[post("/api/group")]
async fn create_group(
    store: web::Data<GroupStore>,
    json: Option<web::Json<NewGroupJson>>,
) -> Result<HttpResponse, ApiError> {
    let json = json.map(web::Json::into_inner).unwrap_or_default();
    let group = new_group(json, Utc::now());
    store.create(&group).await?;
    Ok(no_store(HttpResponse::Created()).json(group))
}

#[get("/api/group/{id}")]
async fn get_group(store: web::Data<GroupStore>, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let group = store.get(&id).await?;
    Ok(no_store(HttpResponse::Ok()).json(group))
}

#[put("/api/group/{id}")]
async fn save_group(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
    json: web::Json<Group>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let incoming = json.into_inner();
    if incoming.id != id {
        return Err(ApiError::BadRequest(
            "body must be a group with matching id".to_string(),
        ));
    }
    let (group, ()) = store.update(&id, |stored| apply_snapshot(stored, incoming)).await?;
    Ok(no_store(HttpResponse::Ok()).json(json!({ "ok": true, "version": group.version })))
}

#[delete("/api/group/{id}")]
async fn delete_group(store: web::Data<GroupStore>, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    if store.delete(&id).await? {
        Ok(no_store(HttpResponse::NoContent()).finish())
    } else {
        Err(ApiError::group_not_found(&id))
    }
}

#[get("/api/group/{id}/balances")]
async fn get_balances(store: web::Data<GroupStore>, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let group = store.get(&id).await?;
    Ok(no_store(HttpResponse::Ok()).json(group.balances))
}

#[post("/api/group/{id}/members")]
async fn post_member(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
    json: web::Json<NewMemberJson>,
) -> Result<HttpResponse, ApiError> {
    let now = Utc::now();
    let (_, member) = store
        .update(&id, |group| add_member(group, json.into_inner(), now))
        .await?;
    Ok(no_store(HttpResponse::Created()).json(member))
}

#[patch("/api/group/{id}/members/{member_id}")]
async fn patch_member(
    store: web::Data<GroupStore>,
    path: web::Path<(String, String)>,
    json: web::Json<MemberStatusJson>,
) -> Result<HttpResponse, ApiError> {
    let (id, member_id) = path.into_inner();
    let (_, member) = store
        .update(&id, |group| set_member_active(group, &member_id, json.is_active))
        .await?;
    Ok(no_store(HttpResponse::Ok()).json(member))
}

#[post("/api/group/{id}/expenses")]
async fn post_expense(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
    json: web::Json<NewExpenseJson>,
) -> Result<HttpResponse, ApiError> {
    let now = Utc::now();
    let (_, expense) = store
        .update(&id, |group| add_expense(group, json.into_inner(), now))
        .await?;
    Ok(no_store(HttpResponse::Created()).json(expense))
}

#[delete("/api/group/{id}/expenses/{expense_id}")]
async fn delete_expense(
    store: web::Data<GroupStore>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (id, expense_id) = path.into_inner();
    store
        .update(&id, |group| remove_expense(group, &expense_id))
        .await?;
    Ok(no_store(HttpResponse::NoContent()).finish())
}

#[post("/api/group/{id}/settlements")]
async fn post_settlement(
    store: web::Data<GroupStore>,
    id: web::Path<String>,
    json: web::Json<NewSettlementJson>,
) -> Result<HttpResponse, ApiError> {
    let now = Utc::now();
    let (_, record) = store
        .update(&id, |group| add_settlement(group, json.into_inner(), now))
        .await?;
    Ok(no_store(HttpResponse::Created()).json(record))
}

#[delete("/api/group/{id}/settlements/{settlement_id}")]
async fn delete_settlement(
    store: web::Data<GroupStore>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (id, settlement_id) = path.into_inner();
    store
        .update(&id, |group| remove_settlement(group, &settlement_id))
        .await?;
    Ok(no_store(HttpResponse::NoContent()).finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_group)
        .service(get_balances)
        .service(get_group)
        .service(save_group)
        .service(delete_group)
        .service(post_member)
        .service(patch_member)
        .service(post_expense)
        .service(delete_expense)
        .service(post_settlement)
        .service(delete_settlement);
}
