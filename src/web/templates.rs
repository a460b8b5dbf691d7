use crate::llm::ChatMessage;

pub const MSG_PLACEHOLDER: &str = "{{MSG}}";

pub const CSS: &str = r#"<style>
body { font-family: sans-serif; margin: 0; display: flex; min-height: 100vh; background: #0e1117; color: #fafafa; }
.sidebar { width: 20rem; padding: 1.5rem; background: #262730; }
.main { flex: 1; padding: 2rem 3rem; max-width: 52rem; }
.chat-message { padding: 1.25rem; border-radius: 0.5rem; margin-bottom: 1rem; display: flex; }
.chat-message.user { background-color: #2b313e; }
.chat-message.bot { background-color: #475063; }
.chat-message .avatar { width: 15%; font-size: 2rem; }
.chat-message .message { width: 85%; padding: 0 1rem; white-space: pre-wrap; }
.notice { padding: 0.75rem 1rem; border-radius: 0.5rem; margin-bottom: 1rem; background: #1c4532; }
.notice.error { background: #63171b; }
input[type=text] { width: 100%; padding: 0.6rem; box-sizing: border-box; }
button { margin-top: 0.75rem; padding: 0.5rem 1.5rem; }
</style>"#;

pub const BOT_TEMPLATE: &str = r#"<div class="chat-message bot">
    <div class="avatar">&#129302;</div>
    <div class="message">{{MSG}}</div>
</div>"#;

pub const USER_TEMPLATE: &str = r#"<div class="chat-message user">
    <div class="avatar">&#128100;</div>
    <div class="message">{{MSG}}</div>
</div>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Everything one page render needs.
#[derive(Debug, Default)]
pub struct PageView<'a> {
    pub history: &'a [ChatMessage],
    pub notice: Option<Notice>,
    pub ready: bool,
}

/// Substitute escaped `text` into a template's single placeholder.
pub fn render_message(template: &str, text: &str) -> String {
    template.replace(MSG_PLACEHOLDER, &html_escape::encode_text(text))
}

/// Even positions use the user template, odd positions the bot template.
pub fn render_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .enumerate()
        .map(|(i, message)| {
            let template = if i % 2 == 0 { USER_TEMPLATE } else { BOT_TEMPLATE };
            render_message(template, &message.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_page(view: &PageView<'_>) -> String {
    let notice = view
        .notice
        .as_ref()
        .map(|n| {
            let class = match n.kind {
                NoticeKind::Info => "notice",
                NoticeKind::Error => "notice error",
            };
            format!(
                r#"<div class="{}">{}</div>"#,
                class,
                html_escape::encode_text(&n.text)
            )
        })
        .unwrap_or_default();

    let hint = if view.ready {
        ""
    } else {
        r#"<p>Upload your PDFs in the sidebar and click <b>Process</b> to start.</p>"#
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Chat with your PDFs</title>
{css}
</head>
<body>
<aside class="sidebar">
  <h3>Your Documents</h3>
  <form action="/process" method="post" enctype="multipart/form-data">
    <label for="documents">Upload your PDFs here and click on Process.</label><br>
    <input id="documents" type="file" name="documents" accept=".pdf,.txt,.md" multiple>
    <br><button type="submit">Process</button>
  </form>
</aside>
<main class="main">
  <h1>Chat about your PDFs &#128214;</h1>
  {notice}
  {hint}
  <form action="/ask" method="post">
    <label for="question">Ask a question about your documents:</label>
    <input id="question" type="text" name="question" autocomplete="off" autofocus>
  </form>
  <section class="history">
{history}
  </section>
</main>
</body>
</html>
"#,
        css = CSS,
        notice = notice,
        hint = hint,
        history = render_history(view.history),
    )
}
