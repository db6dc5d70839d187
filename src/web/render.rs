//! HTML rendering for the transaction form page

use crate::types::transaction::{TransactionRecord, TransactionType};
use crate::types::verdict::Verdict;
use std::fmt::Write;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; background: #fafafa; color: #262730; }
.container { max-width: 720px; margin: 2rem auto; padding: 0 1rem; }
.card { border: 1px solid #e6e6e6; border-radius: 10px; padding: 1.5rem; background: #fff; }
.row { display: flex; gap: 1rem; margin-bottom: 1rem; }
.row label { flex: 1; display: flex; flex-direction: column; font-size: 0.9rem; }
.row input, .row select { margin-top: 0.3rem; padding: 0.5rem; border: 1px solid #ccc; border-radius: 8px; }
hr { border: none; border-top: 1px solid #e6e6e6; margin: 1rem 0; }
button { width: 100%; margin-top: 1.5rem; background-color: #ff4b4b; color: white; border-radius: 10px;
  height: 50px; font-weight: bold; border: none; transition: 0.3s; cursor: pointer; }
button:hover { background-color: #ff3333; box-shadow: 0 4px 8px rgba(0,0,0,0.2); }
button:disabled { background-color: #ccc; cursor: not-allowed; box-shadow: none; }
.message { margin-top: 1.5rem; padding: 1rem; border-radius: 8px; }
.error { background: #ffebee; color: #b71c1c; }
.success { background: #e8f5e9; color: #1b5e20; }
"#;

/// Raw form field values, echoed back after a submission
#[derive(Debug, Clone, PartialEq)]
pub struct FormValues {
    pub transaction_type: String,
    pub amount: String,
    pub sender_old_balance: String,
    pub sender_new_balance: String,
    pub receiver_old_balance: String,
    pub receiver_new_balance: String,
}

impl From<&TransactionRecord> for FormValues {
    fn from(tx: &TransactionRecord) -> Self {
        Self {
            transaction_type: tx.transaction_type.to_string(),
            amount: tx.amount.to_string(),
            sender_old_balance: tx.sender_old_balance.to_string(),
            sender_new_balance: tx.sender_new_balance.to_string(),
            receiver_old_balance: tx.receiver_old_balance.to_string(),
            receiver_new_balance: tx.receiver_new_balance.to_string(),
        }
    }
}

impl Default for FormValues {
    /// The initial form shows money with two decimals
    fn default() -> Self {
        let tx = TransactionRecord::default();
        Self {
            transaction_type: tx.transaction_type.to_string(),
            amount: format!("{:.2}", tx.amount),
            sender_old_balance: format!("{:.2}", tx.sender_old_balance),
            sender_new_balance: format!("{:.2}", tx.sender_new_balance),
            receiver_old_balance: format!("{:.2}", tx.receiver_old_balance),
            receiver_new_balance: format!("{:.2}", tx.receiver_new_balance),
        }
    }
}

/// What to show below the form after the trigger
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Verdict(Verdict),
    /// The prediction itself failed
    Error(String),
    /// The submission never reached the model
    Invalid(String),
}

impl Outcome {
    fn css_class(&self) -> &'static str {
        match self {
            Outcome::Verdict(Verdict::Safe) => "success",
            _ => "error",
        }
    }

    fn message(&self) -> &str {
        match self {
            Outcome::Verdict(verdict) => verdict.message(),
            Outcome::Error(msg) | Outcome::Invalid(msg) => msg.as_str(),
        }
    }
}

/// Escape text for inclusion in HTML content and attribute values
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn number_input(label: &str, name: &str, value: &str) -> String {
    format!(
        r#"<label>{label}<input type="number" name="{name}" min="0" step="0.01" value="{value}" required></label>"#,
        label = label,
        name = name,
        value = escape(value),
    )
}

fn type_select(selected: &str) -> String {
    let mut html = String::from(r#"<label>Transaction Type<select name="type">"#);
    for kind in TransactionType::ALL {
        let attr = if kind.as_str() == selected { " selected" } else { "" };
        let _ = write!(html, r#"<option value="{0}"{1}>{0}</option>"#, kind, attr);
    }
    html.push_str("</select></label>");
    html
}

/// Render the full page.
///
/// `notice` is the persistent model-unavailable message; when present the
/// trigger button is disabled.
pub fn render_page(values: &FormValues, outcome: Option<&Outcome>, notice: Option<&str>) -> String {
    let mut body = String::new();

    body.push_str("<h1>🛡️ Fraud Detection</h1>");
    body.push_str(
        "<p>Enter transaction details below to assess risk levels using our AI model.</p>",
    );

    if let Some(notice) = notice {
        let _ = write!(
            body,
            r#"<div class="message error" role="alert">{}</div>"#,
            escape(notice)
        );
    }

    body.push_str("<h3>📝 Transaction Details</h3>");
    body.push_str(r#"<form method="post" action="/analyze" class="card">"#);

    let _ = write!(
        body,
        r#"<div class="row">{}{}</div><hr>"#,
        type_select(&values.transaction_type),
        number_input("Amount ($)", "amount", &values.amount)
    );
    let _ = write!(
        body,
        r#"<div class="row">{}{}</div>"#,
        number_input("Sender Old Balance", "oldbalanceOrg", &values.sender_old_balance),
        number_input("Sender New Balance", "newbalanceOrig", &values.sender_new_balance)
    );
    let _ = write!(
        body,
        r#"<div class="row">{}{}</div>"#,
        number_input("Receiver Old Balance", "oldbalanceDest", &values.receiver_old_balance),
        number_input("Receiver New Balance", "newbalanceDest", &values.receiver_new_balance)
    );

    let disabled = if notice.is_some() { " disabled" } else { "" };
    let _ = write!(
        body,
        r#"<button type="submit"{}>Analyze Transaction</button></form>"#,
        disabled
    );

    if let Some(outcome) = outcome {
        let _ = write!(
            body,
            r#"<div class="message {}" id="outcome">{}</div>"#,
            outcome.css_class(),
            escape(outcome.message())
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Fraud Detection AI</title>
<style>{}</style>
</head>
<body><main class="container">{}</main></body>
</html>
"#,
        STYLE, body
    )
}
