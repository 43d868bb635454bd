//! Home Page

use leptos::prelude::*;

#[component]
pub fn HomePage() -> impl IntoView {
    view! {
        <div class="home">
            <header class="hero">
                <h1>"Mind Maps"</h1>
                <p class="tagline">"Turn a topic, your notes or a whole book into a mind map"</p>
                <div class="cta">
                    <a href="/login" class="btn btn-primary">"Start free trial"</a>
                    <a href="/pricing" class="btn">"View pricing"</a>
                </div>
            </header>

            <section class="features">
                <div class="feature">
                    <h3>"📚 PDF chapters"</h3>
                    <p>"Upload a book and get one branch per chapter, generated side by side."</p>
                </div>
                <div class="feature">
                    <h3>"🌍 Any language"</h3>
                    <p>"Pick the output language or let it follow your source text."</p>
                </div>
                <div class="feature">
                    <h3>"📤 Export"</h3>
                    <p>"Download as Markdown, a standalone HTML page or an Obsidian canvas."</p>
                </div>
            </section>
        </div>
    }
}
