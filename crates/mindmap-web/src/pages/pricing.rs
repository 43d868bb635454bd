//! Pricing Page

use leptos::prelude::*;

use crate::api::{self, Subscription};

#[component]
pub fn PricingPage() -> impl IntoView {
    let signed_in = api::token().is_some();
    let (subscription, set_subscription) = signal(None::<Subscription>);
    let (loading, set_loading) = signal(false);
    let (error, set_error) = signal(None::<String>);

    if signed_in {
        leptos::task::spawn_local(async move {
            if let Ok(current) = api::subscription().await {
                set_subscription.set(current);
            }
        });
    }

    let run = move |action: &'static str| {
        if loading.get() {
            return;
        }
        set_loading.set(true);
        set_error.set(None);
        leptos::task::spawn_local(async move {
            let result = match action {
                "subscribe" => api::subscribe().await,
                "cancel" => api::cancel().await,
                _ => api::reactivate().await,
            };
            match result {
                Ok(updated) => set_subscription.set(Some(updated)),
                Err(e) => set_error.set(Some(e.to_string())),
            }
            set_loading.set(false);
        });
    };

    let checkout = move |_| {
        leptos::task::spawn_local(async move {
            match api::create_checkout().await {
                Ok(url) => {
                    if let Some(window) = web_sys::window() {
                        let _ = window.location().set_href(&url);
                    }
                }
                Err(e) => set_error.set(Some(e.to_string())),
            }
        });
    };

    // a canceled subscription leaves the user free to start a new one
    let live = move || subscription.get().filter(|s| s.status != "canceled");

    view! {
        <div class="pricing">
            <h1>"Pricing"</h1>
            <p class="subtitle">"Every account starts with a 14-day free trial"</p>

            <div class="plans">
                <div class="plan featured">
                    <h2>"Monthly"</h2>
                    <div class="price">"$9"<span>"/month"</span></div>
                    <ul>
                        <li>"Unlimited mind maps"</li>
                        <li>"PDF books split by chapter"</li>
                        <li>"Markdown, HTML and canvas export"</li>
                    </ul>

                    <Show
                        when=move || signed_in
                        fallback=|| view! { <a href="/login" class="btn btn-primary">"Start free trial"</a> }
                    >
                        {move || match live() {
                            None => view! {
                                <button
                                    class="btn btn-primary"
                                    disabled=move || loading.get()
                                    on:click=move |_| run("subscribe")
                                >
                                    "Subscribe"
                                </button>
                                <button class="btn" on:click=checkout>"Pay with Stripe Checkout"</button>
                            }
                            .into_any(),
                            Some(current) => {
                                let ending = current.cancel_at_period_end;
                                let period_end = current
                                    .current_period_end
                                    .map(|end| end.format("%Y-%m-%d").to_string())
                                    .unwrap_or_default();
                                view! {
                                    <p class="status">"Status: " {current.status}</p>
                                    <Show
                                        when=move || ending
                                        fallback=move || view! {
                                            <button
                                                class="btn"
                                                disabled=move || loading.get()
                                                on:click=move |_| run("cancel")
                                            >
                                                "Cancel at period end"
                                            </button>
                                        }
                                    >
                                        <p>"Ends on " {period_end.clone()}</p>
                                        <button
                                            class="btn btn-primary"
                                            disabled=move || loading.get()
                                            on:click=move |_| run("reactivate")
                                        >
                                            "Keep my subscription"
                                        </button>
                                    </Show>
                                }
                                .into_any()
                            }
                        }}
                    </Show>

                    {move || error.get().map(|e| view! { <p class="error">{e}</p> })}
                </div>
            </div>
        </div>
    }
}
