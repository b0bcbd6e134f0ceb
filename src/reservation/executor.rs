//! Captcha, form submission and confirmation for a locked slot

use std::sync::Arc;

use tracing::{info, warn};

use super::gate::GatePermit;
use super::SuccessPolicy;
use crate::captcha::CaptchaSolver;
use crate::error::{Error, Result};
use crate::models::Task;
use crate::service::RemoteService;

/// How an attempt with a locked slot ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// The captcha was not accepted; the gate was released
    CaptchaRejected,
    /// Form submitted and reservation confirmed
    Reserved,
}

/// Finishes reservations for locked slots
#[derive(Clone)]
pub struct ReservationExecutor {
    service: RemoteService,
    solver: Arc<dyn CaptchaSolver>,
    on_success: SuccessPolicy,
}

impl ReservationExecutor {
    pub fn new(service: RemoteService, solver: Arc<dyn CaptchaSolver>) -> Self {
        Self {
            service,
            solver,
            on_success: SuccessPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_success_policy(mut self, policy: SuccessPolicy) -> Self {
        self.on_success = policy;
        self
    }

    /// Solve the captcha, submit the form and confirm the slot held by `token`
    ///
    /// Consumes the gate permit: it is released on a rejected captcha and on
    /// any error, and handled by the success policy after a reservation.
    ///
    /// # Errors
    ///
    /// Returns transport errors from any of the requests
    pub async fn execute(
        &self,
        task: &Task,
        token: &str,
        permit: GatePermit,
    ) -> Result<ReservationOutcome> {
        let time = task.candidate_time();
        let entity = &task.entity;
        info!(entity = %entity.name, token = %token, time = %time, "Attempt to make reservation");

        let code = match self.solve_captcha().await {
            Ok(code) => code,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!(entity = %entity.name, token = %token, error = %e, "Captcha not recognized");
                permit.release();
                return Ok(ReservationOutcome::CaptchaRejected);
            }
        };
        info!(entity = %entity.name, token = %token, captcha = %code, "Captcha recognized");

        if !self.service.check_captcha(&code).await? {
            info!(entity = %entity.name, token = %token, time = %time, "Captcha rejected");
            permit.release();
            return Ok(ReservationOutcome::CaptchaRejected);
        }
        info!(entity = %entity.name, token = %token, time = %time, "Captcha accepted, submitting form");

        self.service.submit_form(token, &entity.id, &task.form).await?;
        info!(entity = %entity.name, token = %token, time = %time, "Form data posted");

        self.service.confirm(token, &entity.id).await?;
        info!(
            entity = %entity.name,
            token = %token,
            time = %time,
            "Reservation completed, check your e-mail or the service site"
        );

        match self.on_success {
            SuccessPolicy::StopProcess => permit.close(),
            SuccessPolicy::KeepHunting => permit.release(),
        }
        Ok(ReservationOutcome::Reserved)
    }

    async fn solve_captcha(&self) -> Result<String> {
        let image = self.service.captcha_image().await?;
        let solver = Arc::clone(&self.solver);

        let answer = tokio::task::spawn_blocking(move || solver.recognize(&image))
            .await
            .map_err(|e| Error::with_source("captcha solver task failed", e))??;
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, EntityKind, FormRow};
    use crate::reservation::gate::AttemptGate;
    use crate::session::mock::{MockTransport, Reply};
    use crate::session::{Body, Session};
    use crate::utils::error::CaptchaError;
    use chrono::NaiveDate;

    struct FixedSolver(Option<&'static str>);

    impl CaptchaSolver for FixedSolver {
        fn recognize(&self, image: &[u8]) -> std::result::Result<String, CaptchaError> {
            assert_eq!(image, b"PNG");
            self.0
                .map(str::to_string)
                .ok_or(CaptchaError::EmptyAnswer)
        }
    }

    fn task() -> Task {
        let entity = Arc::new(Entity {
            name: "Head of the LP I department".into(),
            short_name: "LP1".into(),
            queue: "20".into(),
            id: "200".into(),
            kind: EntityKind::Department,
        });
        Task::new(
            entity,
            NaiveDate::from_ymd_opt(2024, 5, 21).unwrap(),
            "10:00",
            Arc::new(vec![FormRow::new("Telefon", "500")]),
        )
    }

    fn service_replying(captcha_verdict: &'static str) -> Arc<MockTransport> {
        Arc::new(MockTransport::new(move |req, _n| match req.path.as_str() {
            "/reservations/captcha" => Reply::bytes(b"PNG"),
            "/reservations/captcha/check" => Reply::text(captcha_verdict),
            _ => Reply::text(""),
        }))
    }

    fn executor(transport: &Arc<MockTransport>, answer: Option<&'static str>) -> ReservationExecutor {
        ReservationExecutor::new(
            RemoteService::new(Session::new(transport.clone())),
            Arc::new(FixedSolver(answer)),
        )
    }

    #[tokio::test]
    async fn test_reserved_closes_gate() {
        let transport = service_replying("true");
        let gate = AttemptGate::new();
        let permit = gate.acquire().await.unwrap();

        let outcome = executor(&transport, Some("x7k2"))
            .execute(&task(), "TOKEN123", permit)
            .await
            .unwrap();

        assert_eq!(outcome, ReservationOutcome::Reserved);
        assert!(gate.is_closed());

        let check = &transport.requests_to("/reservations/captcha/check")[0];
        assert_eq!(check.form_value("code"), Some("x7k2"));

        let submit = &transport.requests_to("/reservations/reservations/updateFormData/TOKEN123/200")[0];
        assert_eq!(
            submit.body,
            Body::Json(r#"[{"name":"Telefon","value":"500"}]"#.to_string())
        );
        assert_eq!(
            transport.requests_to("/reservations/reservations/reserv/TOKEN123/200").len(),
            1
        );
    }

    #[tokio::test]
    async fn test_keep_hunting_releases_gate() {
        let transport = service_replying("true");
        let gate = AttemptGate::new();
        let permit = gate.acquire().await.unwrap();

        let outcome = executor(&transport, Some("x7k2"))
            .with_success_policy(SuccessPolicy::KeepHunting)
            .execute(&task(), "T", permit)
            .await
            .unwrap();

        assert_eq!(outcome, ReservationOutcome::Reserved);
        assert!(!gate.is_closed());
        assert!(gate.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_rejected_captcha_releases_gate() {
        let transport = service_replying("false");
        let gate = AttemptGate::new();
        let permit = gate.acquire().await.unwrap();

        let outcome = executor(&transport, Some("wrong"))
            .execute(&task(), "TOKEN123", permit)
            .await
            .unwrap();

        assert_eq!(outcome, ReservationOutcome::CaptchaRejected);
        assert!(gate.try_acquire().is_some());
        assert!(transport.requests_to("/reservations/reservations").is_empty());
    }

    #[tokio::test]
    async fn test_solver_error_counts_as_rejection() {
        let transport = service_replying("true");
        let gate = AttemptGate::new();
        let permit = gate.acquire().await.unwrap();

        let outcome = executor(&transport, None)
            .execute(&task(), "TOKEN123", permit)
            .await
            .unwrap();

        assert_eq!(outcome, ReservationOutcome::CaptchaRejected);
        assert!(!gate.is_held());
        assert!(transport.requests_to("/reservations/captcha/check").is_empty());
    }
}
