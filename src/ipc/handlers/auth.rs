use serde_json::json;

use crate::backend::AuthSession;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request, SessionInfo};

fn session_result(session: &AuthSession) -> serde_json::Value {
    json!({
        "accessToken": session.access_token,
        "tokenType": session.token_type,
        "user": {
            "id": session.user.id,
            "email": session.user.email,
            "fullName": session.user.full_name,
            "role": session.user.role
        }
    })
}

fn adopt_session(state: &mut AppState, session: &AuthSession) {
    if let Some(backend) = state.backend.as_mut() {
        backend.set_token(Some(session.access_token.clone()));
    }
    state.session = Some(SessionInfo {
        token: session.access_token.clone(),
        user: session.user.clone(),
    });
    if let Some(conn) = state.db.as_ref() {
        let _ = db::settings_set_json(
            conn,
            db::SESSION_KEY,
            &json!({ "token": session.access_token, "user": session.user }),
        );
    }
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = req
        .params
        .get("email")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let password = req
        .params
        .get("password")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    if email.is_empty() || !email.contains('@') {
        return err(&req.id, "bad_params", "a valid email is required", None);
    }
    if password.chars().count() < 8 {
        return err(
            &req.id,
            "bad_params",
            "password must be at least 8 characters",
            None,
        );
    }

    let Some(backend) = state.backend.as_mut() else {
        return err(&req.id, "no_session", "call session.init first", None);
    };
    match backend.login(&email, &password) {
        Ok(session) => {
            adopt_session(state, &session);
            ok(&req.id, session_result(&session))
        }
        // Generic on purpose: backend detail never reaches the user.
        Err(_) => err(&req.id, "auth_failed", "invalid credentials", None),
    }
}

fn handle_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = req
        .params
        .get("email")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let password = req
        .params
        .get("password")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let full_name = req
        .params
        .get("fullName")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let role = req
        .params
        .get("role")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    if email.is_empty() || !email.contains('@') {
        return err(&req.id, "bad_params", "a valid email is required", None);
    }
    if password.chars().count() < 8 {
        return err(
            &req.id,
            "bad_params",
            "password must be at least 8 characters",
            None,
        );
    }
    if full_name.is_empty() {
        return err(&req.id, "bad_params", "fullName must not be empty", None);
    }
    if role != "student" && role != "teacher" {
        return err(
            &req.id,
            "bad_params",
            "role must be \"student\" or \"teacher\"",
            None,
        );
    }

    let Some(backend) = state.backend.as_mut() else {
        return err(&req.id, "no_session", "call session.init first", None);
    };
    match backend.register(&email, &password, &full_name, &role) {
        Ok(session) => {
            adopt_session(state, &session);
            ok(&req.id, session_result(&session))
        }
        Err(_) => err(&req.id, "auth_failed", "registration failed", None),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session = None;
    if let Some(backend) = state.backend.as_mut() {
        backend.set_token(None);
    }
    if let Some(conn) = state.db.as_ref() {
        let _ = db::settings_delete(conn, db::SESSION_KEY);
    }
    ok(&req.id, json!({ "loggedOut": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.register" => Some(handle_register(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        _ => None,
    }
}
