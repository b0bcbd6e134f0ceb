//! Typed access to the reservation service endpoints
//!
//! Every call goes through [`Session::send_with_retry`], so a transport
//! failure is retried according to the session's policy and only surfaces
//! once that policy gives up.

use bytes::Bytes;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Entity, FormRow};
use crate::scanner::parse::{extract_latest_date, extract_slots};
use crate::session::headers::{json_content_type, xhr_header};
use crate::session::{Request, Response, Session};

/// Client for the `/reservations` endpoints
#[derive(Clone)]
pub struct RemoteService {
    session: Session,
}

impl RemoteService {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    async fn send(&self, request: Request) -> Result<Response> {
        Ok(self.session.send_with_retry(&request).await?)
    }

    /// Log in; the session cookie lands in the shared jar
    ///
    /// # Errors
    ///
    /// Returns `Error::LoginFailed` when the login form is rendered again
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let request = Request::post("/reservations/pol/login").form([
            ("data[User][email]", email),
            ("data[User][password]", password),
        ]);

        let response = self.send(request).await?;
        // Success answers with a redirect; 200 means the form came back
        if response.status() == 200 {
            return Err(Error::LoginFailed);
        }

        info!(login = %email, status = response.status(), "Logged in");
        Ok(())
    }

    /// Accept the terms of an entity, required before its calendar is shown
    pub async fn accept_terms(&self, entity: &Entity) -> Result<()> {
        let path = format!(
            "/reservations/opmenus/terms/{}/{}?accepted=true",
            entity.queue, entity.id
        );
        self.send(Request::get(path)).await?;
        Ok(())
    }

    /// Latest open date in the entity's calendar
    pub async fn latest_date(&self, entity: &Entity) -> Result<NaiveDate> {
        self.accept_terms(entity).await?;

        let path = format!("/reservations/pol/queues/{}/{}", entity.queue, entity.id);
        let page = self.send(Request::get(path)).await?.text();
        let date = extract_latest_date(&page)?;

        debug!(entity = %entity.name, date = %date, "Latest open date");
        Ok(date)
    }

    /// Slot times published for `date`
    pub async fn slots(&self, entity: &Entity, date: NaiveDate) -> Result<Vec<String>> {
        let path = format!(
            "/reservations/pol/queues/{}/{}/{}",
            entity.queue,
            entity.id,
            date.format("%Y-%m-%d")
        );
        let (name, value) = xhr_header();
        let fragment = self
            .send(Request::get(path).header(name, value))
            .await?
            .text();

        Ok(extract_slots(&fragment))
    }

    /// Raw lock request for `time` in `queue`; the caller interprets the body
    pub async fn lock(&self, time: &str, queue: &str) -> Result<Response> {
        let request = Request::post("/reservations/reservations/lock")
            .form([("time", time), ("queue", queue)]);
        self.send(request).await
    }

    /// Current captcha image
    pub async fn captcha_image(&self) -> Result<Bytes> {
        Ok(self
            .send(Request::get("/reservations/captcha"))
            .await?
            .into_bytes())
    }

    /// Whether the service accepts `code` as the current captcha
    pub async fn check_captcha(&self, code: &str) -> Result<bool> {
        let request = Request::post("/reservations/captcha/check").form([("code", code)]);
        let body = self.send(request).await?.text();
        Ok(body.trim() == "true")
    }

    /// Submit applicant data for a locked slot
    pub async fn submit_form(&self, token: &str, entity_id: &str, form: &[FormRow]) -> Result<()> {
        let path = format!("/reservations/reservations/updateFormData/{token}/{entity_id}");
        let (name, value) = json_content_type();
        let request = Request::post(path)
            .header(name, value)
            .json(serde_json::to_string(form)?);

        let response = self.send(request).await?;
        debug!(token = %token, status = response.status(), "Form data submitted");
        Ok(())
    }

    /// Confirm the reservation of a locked slot
    pub async fn confirm(&self, token: &str, entity_id: &str) -> Result<Response> {
        let path = format!("/reservations/reservations/reserv/{token}/{entity_id}");
        self.send(Request::get(path)).await
    }
}
