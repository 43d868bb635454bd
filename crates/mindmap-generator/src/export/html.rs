//! Self-contained HTML viewer built on the markmap renderer

use mindmap_core::OutlineNode;
use serde_json::{Value, json};

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{title}}</title>
    <style>
        * { margin: 0; padding: 0; }
        #mindmap { display: block; width: 100vw; height: 100vh; }
    </style>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/markmap-toolbar@0.17.3-alpha.8/dist/style.css">
</head>
<body>
    <svg id="mindmap"></svg>
    <script src="https://cdn.jsdelivr.net/npm/d3@7.9.0/dist/d3.min.js"></script>
    <script src="https://cdn.jsdelivr.net/npm/markmap-view@0.17.3-alpha.8/dist/browser/index.js"></script>
    <script src="https://cdn.jsdelivr.net/npm/markmap-toolbar@0.17.3-alpha.8/dist/index.js"></script>
    <script>
        ((getMarkmap, data, options) => {
            const { Markmap, deriveOptions } = getMarkmap();
            window.mm = Markmap.create('svg#mindmap', deriveOptions(options), data);
            window.mm.fit();
        })(() => window.markmap, {{data}}, { "colorFreezeLevel": 2, "initialExpandLevel": 2, "maxWidth": 300 });
    </script>
    <script>
        setTimeout(() => {
            const { markmap, mm } = window;
            const toolbar = new markmap.Toolbar();
            toolbar.attach(mm);
            const el = toolbar.render();
            el.setAttribute('style', 'position:absolute;bottom:20px;right:20px');
            document.body.append(el);
        });
    </script>
</body>
</html>
"#;

pub fn to_html(title: &str, root: &OutlineNode) -> String {
    let data = markmap_json(root).to_string().replace("</", "<\\/");
    TEMPLATE
        .replace("{{title}}", &escape_html(title))
        .replace("{{data}}", &data)
}

/// `{ "content": label, "children": [...] }`
fn markmap_json(node: &OutlineNode) -> Value {
    json!({
        "content": node.label,
        "children": node.children.iter().map(markmap_json).collect::<Vec<_>>(),
    })
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
