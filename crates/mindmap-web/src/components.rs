//! UI Components

use leptos::prelude::*;

use crate::api::{self, AccessStatus, OutlineNode};

/// Top navigation with a sign-out action when a token is present
#[component]
pub fn NavBar() -> impl IntoView {
    let signed_in = api::token().is_some();

    let sign_out = move |_| {
        leptos::task::spawn_local(async move {
            api::logout().await;
            if let Some(window) = web_sys::window() {
                let _ = window.location().set_href("/");
            }
        });
    };

    view! {
        <nav class="navbar">
            <a href="/" class="brand">"Mind Maps"</a>
            <a href="/pricing">"Pricing"</a>
            <Show
                when=move || signed_in
                fallback=|| view! { <a href="/login" class="btn">"Sign in"</a> }
            >
                <a href="/dashboard">"Dashboard"</a>
                <button class="btn" on:click=sign_out>"Sign out"</button>
            </Show>
        </nav>
    }
}

/// Trial or subscription state shown above the dashboard
#[component]
pub fn AccessBanner(access: AccessStatus) -> impl IntoView {
    let (class, message) = if access.in_trial {
        (
            "banner banner-trial",
            format!(
                "Free trial: {} day(s) left (ends {})",
                access.trial_days_left,
                access.trial_ends_at.format("%Y-%m-%d")
            ),
        )
    } else if access.has_access {
        let message = if access.cancel_at_period_end {
            "Subscribed until the end of the current period".to_string()
        } else {
            "Subscription active".to_string()
        };
        ("banner banner-active", message)
    } else {
        (
            "banner banner-expired",
            "Your free trial has ended. Subscribe to keep generating mind maps.".to_string(),
        )
    };
    let blocked = !access.has_access;

    view! {
        <div class=class>
            <span>{message}</span>
            <Show when=move || blocked>
                <a href="/pricing" class="btn btn-primary">"Subscribe"</a>
            </Show>
        </div>
    }
}

/// Nested list rendering of an outline tree
#[component]
pub fn OutlineView(node: OutlineNode) -> AnyView {
    let children = node
        .children
        .into_iter()
        .map(|child| view! { <OutlineView node=child /> })
        .collect_view();

    view! {
        <li>
            <span class="node-label">{node.label}</span>
            <ul>{children}</ul>
        </li>
    }
    .into_any()
}
