use actix_web::{web, HttpRequest, HttpResponse, Responder};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use validator::Validate;

use crate::models::{Action, Candidate, CandidatesResponse, SwipeRequest, SwipeResponse};

const SAMPLE_INTERESTS: &[&str] = &[
    "climbing", "hiking", "bouldering", "music", "reading",
    "cooking", "running", "yoga", "gaming", "travel",
];
const FIRST_NAMES: &[&str] = &[
    "Alex", "Sam", "Charlie", "Noa", "Léa", "Inès", "Eli", "Robin", "Nora", "Maya",
];
const LAST_NAMES: &[&str] = &["Martin", "Bernard", "Petit", "Robert", "Richard", "Durand", "Dubois"];

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

/// Shared state of the mock candidate service
#[derive(Debug, Clone)]
pub struct MockState {
    /// Probability that a `like` comes back as a match.
    pub match_rate: f64,
}

impl Default for MockState {
    fn default() -> Self {
        Self { match_rate: 0.18 }
    }
}

/// Configure the mock candidate service routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/candidates", web::get().to(candidates))
        .route("/swipe", web::post().to(swipe))
        .route("/healthz", web::get().to(healthz));
}

/// Reject any `Authorization` header that is not a bearer credential.
fn check_auth(req: &HttpRequest) -> Option<HttpResponse> {
    let header = req.headers().get(actix_web::http::header::AUTHORIZATION)?;
    let valid = header
        .to_str()
        .map(|v| v.starts_with("Bearer "))
        .unwrap_or(false);
    if valid {
        None
    } else {
        Some(HttpResponse::Unauthorized().body("invalid auth header"))
    }
}

fn random_name<R: Rng>(rng: &mut R) -> String {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Martin");
    format!("{} {}", first, last)
}

fn random_interests<R: Rng>(rng: &mut R) -> Vec<String> {
    let n = rng.gen_range(1..=4);
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let interest = SAMPLE_INTERESTS[rng.gen_range(0..SAMPLE_INTERESTS.len())];
        if seen.insert(interest) {
            out.push(interest.to_string());
        }
    }
    out
}

/// Generate `limit` random candidates
pub fn random_candidates(limit: usize) -> Vec<Candidate> {
    let mut rng = rand::thread_rng();
    (0..limit)
        .map(|_| Candidate {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: random_name(&mut rng),
            age: rng.gen_range(20..40),
            interests: random_interests(&mut rng),
        })
        .collect()
}

/// GET /candidates?limit=<n>
///
/// `limit` outside 1..=100 (or unparsable) falls back to 20.
async fn candidates(
    req: HttpRequest,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    if let Some(rejection) = check_auth(&req) {
        return rejection;
    }

    let limit = query
        .get("limit")
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| (1..=MAX_LIMIT).contains(n))
        .unwrap_or(DEFAULT_LIMIT);

    tracing::debug!("Serving {} mock candidates", limit);

    HttpResponse::Ok().json(CandidatesResponse {
        results: Some(random_candidates(limit)),
    })
}

/// POST /swipe
///
/// Request body:
/// ```json
/// { "candidate_id": "string", "action": "like|pass" }
/// ```
async fn swipe(state: web::Data<MockState>, req: HttpRequest, body: web::Bytes) -> impl Responder {
    if let Some(rejection) = check_auth(&req) {
        return rejection;
    }

    let request: SwipeRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::info!("Rejecting malformed swipe body: {}", e);
            return HttpResponse::BadRequest().body("bad json");
        }
    };
    if let Err(errors) = request.validate() {
        return HttpResponse::BadRequest().body(format!("invalid request: {}", errors));
    }
    let action = match request.action.parse::<Action>() {
        Ok(action) => action,
        Err(_) => return HttpResponse::BadRequest().body("action must be like or pass"),
    };

    let matched = action == Action::Like && rand::thread_rng().gen_bool(state.match_rate.clamp(0.0, 1.0));
    let message = if matched { "it's a match!" } else { "ok" };

    HttpResponse::Ok().json(SwipeResponse {
        matched,
        message: message.to_string(),
    })
}

/// GET /healthz
async fn healthz() -> impl Responder {
    HttpResponse::Ok().finish()
}
