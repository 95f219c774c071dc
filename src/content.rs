use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Static landing-page content. Public; no token involved.
#[derive(Debug, Serialize)]
pub struct LandingPageContent {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub features: Vec<Feature>,
    pub call_to_action: CallToAction,
}

#[derive(Debug, Serialize)]
pub struct Feature {
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CallToAction {
    pub title: &'static str,
    pub description: &'static str,
    pub button_text: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/content/landing", get(landing_page))
}

async fn landing_page() -> Json<LandingPageContent> {
    Json(LandingPageContent {
        title: "Welcome to Our Amazing App",
        subtitle: "Build faster, scale better, and deliver exceptional user experiences",
        features: vec![
            Feature {
                title: "Responsive Design",
                description: "Beautiful interfaces that work seamlessly across all devices",
                icon: "pi-mobile",
            },
            Feature {
                title: "Secure Authentication",
                description: "Enterprise-grade security with modern authentication flows",
                icon: "pi-shield",
            },
            Feature {
                title: "Real-time Dashboard",
                description: "Monitor and manage your data with live updates and insights",
                icon: "pi-chart-line",
            },
        ],
        call_to_action: CallToAction {
            title: "Ready to Get Started?",
            description: "Join thousands of users who are already building amazing things",
            button_text: "Sign Up Now",
        },
    })
}
