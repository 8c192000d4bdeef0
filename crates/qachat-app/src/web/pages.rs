use qachat_types::{ChatTurn, Page, Role, INLINE_TURNS};

use crate::session::{Notice, NoticeKind, SessionContext};

const STYLE: &str = r#"
body { font-family: 'Poppins', sans-serif; max-width: 860px; margin: 2em auto; padding: 0 1em; }
.chat-box { border-radius: 10px; padding: 10px; margin: 10px 0; background-color: #f0f2f6; white-space: pre-wrap; }
.user-message { color: #3b3b3b; }
.bot-message { color: #1a8e5f; }
.notice { border-radius: 8px; padding: 8px 12px; margin: 12px 0; }
.notice.success { background: #e6f6ec; color: #14633a; }
.notice.info { background: #e8f1fb; color: #1d4f82; }
.notice.error { background: #fdecec; color: #9b1c1c; }
form.inline { display: inline; }
header { display: flex; justify-content: space-between; align-items: center; }
label { display: block; margin-top: 8px; }
input[type=text], input[type=email], input[type=password] { width: 100%; padding: 6px; }
button { margin-top: 12px; padding: 8px 16px; border-radius: 8px; border: 0; background: #00aaff; color: white; cursor: pointer; }
button.logout { background: #ff4b4b; }
button.link { background: none; color: #007acc; padding: 0; }
"#;

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
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

/// Render whatever page `ctx` is on
pub fn render(ctx: &SessionContext, notice: Option<&Notice>, title: &str) -> String {
    let body = match (ctx.username(), ctx.page()) {
        (Some(username), _) => chat_view(ctx, username, title),
        (None, Some(Page::Signup)) => signup_form(),
        (None, _) => login_form(),
    };

    let banner = notice.map(notice_html).unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{banner}{body}</body>\n</html>\n",
        title = escape_html(title),
    )
}

fn notice_html(notice: &Notice) -> String {
    let class = match notice.kind {
        NoticeKind::Success => "success",
        NoticeKind::Info => "info",
        NoticeKind::Error => "error",
    };
    format!(
        "<div class=\"notice {}\" role=\"status\">{}</div>\n",
        class,
        escape_html(&notice.text)
    )
}

fn login_form() -> String {
    r#"<h3>Login</h3>
<form method="post" action="/login">
<label>Username <input type="text" name="username" required autofocus></label>
<label>Password <input type="password" name="password"></label>
<button type="submit">Login</button>
</form>
<form method="get" action="/signup"><button type="submit" class="link">Create New Account</button></form>
"#
    .to_string()
}

fn signup_form() -> String {
    r#"<h3>Create a New Account</h3>
<form method="post" action="/signup">
<label>Choose a Username <input type="text" name="username" required autofocus></label>
<label>Your Email <input type="email" name="email"></label>
<label>Create a Password <input type="password" name="password"></label>
<button type="submit">Sign Up</button>
</form>
<form method="get" action="/login"><button type="submit" class="link">Already existing user? Login</button></form>
"#
    .to_string()
}

fn chat_view(ctx: &SessionContext, username: &str, title: &str) -> String {
    let username = escape_html(username);
    let history = ctx.current_history();
    let split = history.len().min(INLINE_TURNS);
    let (recent, earlier) = history.split_at(split);

    let mut html = format!(
        "<header><h2>{} - {}</h2>\n\
         <form method=\"post\" action=\"/logout\" class=\"inline\"><button type=\"submit\" class=\"logout\">Logout</button></form></header>\n\
         <p>Welcome, {}!</p>\n",
        escape_html(title),
        username,
        username
    );

    html.push_str(
        "<form method=\"post\" action=\"/ask\">\n\
         <label>Ask a question: <input type=\"text\" name=\"question\" autofocus></label>\n\
         <button type=\"submit\">Submit</button>\n</form>\n",
    );

    if let Some(pending) = &ctx.pending_question {
        html.push_str(&format!(
            "<form method=\"post\" action=\"/retry\"><p>Last question not answered: <em>{}</em></p>\
             <button type=\"submit\">Retry</button></form>\n",
            escape_html(pending)
        ));
    }

    html.push_str("<h3>Chat Response</h3>\n");
    for turn in recent {
        html.push_str(&turn_html(turn));
    }

    html.push_str(&format!(
        "<details class=\"dropdown-history\"><summary>Chat History ({} earlier)</summary>\n",
        earlier.len()
    ));
    for turn in earlier {
        html.push_str(&turn_html(turn));
    }
    html.push_str("</details>\n");

    html
}

fn turn_html(turn: &ChatTurn) -> String {
    let (class, icon) = match turn.role {
        Role::User => ("user-message", "👤"),
        Role::Assistant => ("bot-message", "🤖"),
    };
    format!(
        "<div class=\"chat-box {}\">{} {}: {}</div>\n",
        class,
        icon,
        turn.role.display_name(),
        escape_html(&turn.text)
    )
}
