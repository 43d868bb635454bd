//! Dashboard: saved maps, the generate form and exports

use leptos::{html, prelude::*};
use wasm_bindgen_futures::JsFuture;

use crate::api::{self, ApiError, Export, GenerationInput, GenerationRequest, MindMap};
use crate::components::{AccessBanner, OutlineView};

const EXPORT_FORMATS: [(&str, &str); 3] = [("md", "Markdown"), ("html", "HTML"), ("canvas", "Canvas")];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    Topic,
    Text,
    Markdown,
    Pdf,
}

impl Source {
    fn parse(value: &str) -> Self {
        match value {
            "text" => Self::Text,
            "markdown" => Self::Markdown,
            "pdf" => Self::Pdf,
            _ => Self::Topic,
        }
    }
}

fn go_to(path: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.location().set_href(path);
    }
}

async fn read_file(file: web_sys::File) -> Result<Vec<u8>, String> {
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|_| "Could not read the selected file".to_string())?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

#[component]
pub fn DashboardPage() -> impl IntoView {
    let (me, set_me) = signal(None::<api::Me>);
    let (maps, set_maps) = signal(Vec::<api::MindMapSummary>::new());
    let (languages, set_languages) = signal(Vec::<api::Language>::new());
    let (selected, set_selected) = signal(None::<MindMap>);
    let (export, set_export) = signal(None::<Export>);

    let (source, set_source) = signal(Source::Topic);
    let (title, set_title) = signal(String::new());
    let (topic, set_topic) = signal(String::new());
    let (description, set_description) = signal(String::new());
    let (text, set_text) = signal(String::new());
    let (language, set_language) = signal("auto".to_string());
    let (loading, set_loading) = signal(false);
    let (error, set_error) = signal(None::<ApiError>);
    let file_input = NodeRef::<html::Input>::new();

    let refresh = move || {
        leptos::task::spawn_local(async move {
            match api::me().await {
                Ok(current) => set_me.set(Some(current)),
                Err(e) if e.is_unauthenticated() => {
                    go_to("/login");
                    return;
                }
                Err(e) => set_error.set(Some(e)),
            }
            if let Ok(list) = api::list_mindmaps().await {
                set_maps.set(list);
            }
        });
    };

    if api::token().is_none() {
        go_to("/login");
    } else {
        refresh();
        leptos::task::spawn_local(async move {
            if let Ok(list) = api::languages().await {
                set_languages.set(list);
            }
        });
    }

    let open = move |id: String| {
        set_export.set(None);
        leptos::task::spawn_local(async move {
            match api::get_mindmap(&id).await {
                Ok(map) => set_selected.set(Some(map)),
                Err(e) => set_error.set(Some(e)),
            }
        });
    };

    let generate = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if loading.get() {
            return;
        }
        set_loading.set(true);
        set_error.set(None);

        let title = title.get();
        let language = language.get();
        let request = match source.get() {
            Source::Topic => Some(GenerationInput::Topic {
                topic: topic.get(),
                description: description.get(),
            }),
            Source::Text => Some(GenerationInput::Text { text: text.get() }),
            Source::Markdown | Source::Pdf => None,
        };
        let markdown = (source.get() == Source::Markdown).then(|| text.get());
        let file = file_input
            .get()
            .and_then(|input| input.files())
            .and_then(|files| files.get(0));

        leptos::task::spawn_local(async move {
            let result = match (request, markdown, file) {
                (_, Some(markdown), _) => api::create_from_markdown(&title, &markdown, &language).await,
                (Some(input), None, _) => {
                    let title = if title.trim().is_empty() {
                        match &input {
                            GenerationInput::Topic { topic, .. } => topic.clone(),
                            GenerationInput::Text { .. } => "Mind map".to_string(),
                        }
                    } else {
                        title
                    };
                    api::generate(&GenerationRequest { title, input, language }).await
                }
                (None, None, Some(file)) => {
                    let name = file.name();
                    match read_file(file).await {
                        Ok(bytes) => api::upload(name, bytes, &title, &language).await,
                        Err(message) => Err(ApiError {
                            message,
                            code: "FILE_ERROR".into(),
                        }),
                    }
                }
                (None, None, None) => Err(ApiError {
                    message: "Choose a PDF file first".into(),
                    code: "VALIDATION_ERROR".into(),
                }),
            };

            match result {
                Ok(map) => {
                    set_export.set(None);
                    set_selected.set(Some(map));
                    refresh();
                }
                Err(e) => set_error.set(Some(e)),
            }
            set_loading.set(false);
        });
    };

    let delete = move |id: String| {
        leptos::task::spawn_local(async move {
            match api::delete_mindmap(&id).await {
                Ok(()) => {
                    set_selected.set(None);
                    refresh();
                }
                Err(e) => set_error.set(Some(e)),
            }
        });
    };

    let download = move |id: String, format: &'static str| {
        leptos::task::spawn_local(async move {
            match api::export(&id, format).await {
                Ok(file) => set_export.set(Some(file)),
                Err(e) => set_error.set(Some(e)),
            }
        });
    };

    view! {
        <div class="dashboard">
            {move || me.get().map(|me| view! {
                <p class="account">"Signed in as " {me.user.username} " (" {me.user.email} ")"</p>
                <AccessBanner access=me.access />
            })}

            <aside class="sidebar">
                <h2>"Your mind maps"</h2>
                <Show when=move || maps.get().is_empty()>
                    <p class="empty">"Nothing here yet."</p>
                </Show>
                <ul class="map-list">
                    <For
                        each=move || maps.get()
                        key=|map| map.id.clone()
                        children=move |map| {
                            let id = map.id.clone();
                            view! {
                                <li class="map-item" on:click=move |_| open(id.clone())>
                                    <span class="title">{map.title}</span>
                                    <span class="meta">
                                        {map.language} " · " {map.updated_at.format("%Y-%m-%d").to_string()}
                                    </span>
                                </li>
                            }
                        }
                    />
                </ul>
            </aside>

            <section class="workspace">
                <form class="generate" on:submit=generate>
                    <h2>"New mind map"</h2>
                    <div class="field">
                        <label>"Source"</label>
                        <select on:change=move |ev| set_source.set(Source::parse(&event_target_value(&ev)))>
                            <option value="topic">"Topic"</option>
                            <option value="text">"Text"</option>
                            <option value="markdown">"Existing outline (Markdown)"</option>
                            <option value="pdf">"PDF document"</option>
                        </select>
                    </div>
                    <div class="field">
                        <label>"Title"</label>
                        <input
                            type="text"
                            placeholder="Optional"
                            prop:value=move || title.get()
                            on:input=move |ev| set_title.set(event_target_value(&ev))
                        />
                    </div>

                    <Show when=move || source.get() == Source::Topic>
                        <div class="field">
                            <label>"Topic"</label>
                            <input
                                type="text"
                                prop:value=move || topic.get()
                                on:input=move |ev| set_topic.set(event_target_value(&ev))
                            />
                        </div>
                        <div class="field">
                            <label>"What should it cover?"</label>
                            <textarea
                                prop:value=move || description.get()
                                on:input=move |ev| set_description.set(event_target_value(&ev))
                            />
                        </div>
                    </Show>
                    <Show when=move || matches!(source.get(), Source::Text | Source::Markdown)>
                        <div class="field">
                            <label>{move || if source.get() == Source::Markdown { "Outline" } else { "Text" }}</label>
                            <textarea
                                class="large"
                                prop:value=move || text.get()
                                on:input=move |ev| set_text.set(event_target_value(&ev))
                            />
                        </div>
                    </Show>
                    <Show when=move || source.get() == Source::Pdf>
                        <div class="field">
                            <label>"PDF file"</label>
                            <input type="file" accept="application/pdf" node_ref=file_input />
                        </div>
                    </Show>

                    <div class="field">
                        <label>"Language"</label>
                        <select on:change=move |ev| set_language.set(event_target_value(&ev))>
                            <For
                                each=move || languages.get()
                                key=|lang| lang.code.clone()
                                children=move |lang| {
                                    let selected = lang.code == language.get_untracked();
                                    view! { <option value=lang.code selected=selected>{lang.name}</option> }
                                }
                            />
                        </select>
                    </div>

                    {move || error.get().map(|e| {
                        let upgrade = e.needs_subscription();
                        view! {
                            <p class="error">
                                {e.message}
                                <Show when=move || upgrade>
                                    " " <a href="/pricing">"See plans"</a>
                                </Show>
                            </p>
                        }
                    })}

                    <button type="submit" class="btn btn-primary" disabled=move || loading.get()>
                        {move || if loading.get() { "Generating..." } else { "Generate" }}
                    </button>
                </form>

                {move || selected.get().map(|map| {
                    let id = map.id.clone();
                    let delete_id = map.id.clone();
                    view! {
                        <article class="mindmap">
                            <header>
                                <h2>{map.title}</h2>
                                <div class="actions">
                                    {EXPORT_FORMATS
                                        .into_iter()
                                        .map(|(format, label)| {
                                            let id = id.clone();
                                            view! {
                                                <button class="btn" on:click=move |_| download(id.clone(), format)>
                                                    {label}
                                                </button>
                                            }
                                        })
                                        .collect_view()}
                                    <button class="btn btn-danger" on:click=move |_| delete(delete_id.clone())>
                                        "Delete"
                                    </button>
                                </div>
                                {move || export.get().map(|file| {
                                    let label = format!("Download {}", file.file_name);
                                    view! {
                                        <a class="download" href=file.href download=file.file_name>
                                            {label}
                                        </a>
                                    }
                                })}
                            </header>
                            <ul class="outline">
                                <OutlineView node=map.outline />
                            </ul>
                        </article>
                    }
                })}
            </section>
        </div>
    }
}
