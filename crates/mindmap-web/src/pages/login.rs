//! Sign-in and registration

use leptos::prelude::*;

use crate::api;

#[component]
pub fn LoginPage() -> impl IntoView {
    let (registering, set_registering) = signal(false);
    let (username, set_username) = signal(String::new());
    let (email, set_email) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (loading, set_loading) = signal(false);
    let (error, set_error) = signal(None::<String>);

    let submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if loading.get() {
            return;
        }
        set_loading.set(true);
        set_error.set(None);

        let (username, email, password) = (username.get(), email.get(), password.get());
        let register = registering.get();
        leptos::task::spawn_local(async move {
            let result = if register {
                api::register(&username, &email, &password).await
            } else {
                api::login(&username, &password).await
            };
            match result {
                Ok(_) => {
                    // full reload so the navigation bar picks up the new session
                    if let Some(window) = web_sys::window() {
                        let _ = window.location().set_href("/dashboard");
                    }
                }
                Err(e) => {
                    set_error.set(Some(e.to_string()));
                    set_loading.set(false);
                }
            }
        });
    };

    view! {
        <div class="auth">
            <h1>{move || if registering.get() { "Create account" } else { "Sign in" }}</h1>
            <Show when=move || registering.get()>
                <p class="subtitle">"New accounts include a 14-day free trial."</p>
            </Show>

            <form on:submit=submit>
                <div class="field">
                    <label>"Username"</label>
                    <input
                        type="text"
                        prop:value=move || username.get()
                        on:input=move |ev| set_username.set(event_target_value(&ev))
                    />
                </div>
                <Show when=move || registering.get()>
                    <div class="field">
                        <label>"Email"</label>
                        <input
                            type="email"
                            prop:value=move || email.get()
                            on:input=move |ev| set_email.set(event_target_value(&ev))
                        />
                    </div>
                </Show>
                <div class="field">
                    <label>"Password"</label>
                    <input
                        type="password"
                        prop:value=move || password.get()
                        on:input=move |ev| set_password.set(event_target_value(&ev))
                    />
                </div>

                {move || error.get().map(|e| view! { <p class="error">{e}</p> })}

                <button type="submit" class="btn btn-primary" disabled=move || loading.get()>
                    {move || match (loading.get(), registering.get()) {
                        (true, _) => "...",
                        (false, true) => "Create account",
                        (false, false) => "Sign in",
                    }}
                </button>
            </form>

            <button class="link" on:click=move |_| set_registering.update(|r| *r = !*r)>
                {move || if registering.get() {
                    "Already have an account? Sign in"
                } else {
                    "New here? Create an account"
                }}
            </button>
        </div>
    }
}
