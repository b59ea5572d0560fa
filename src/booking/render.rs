//! HTML for the booking page.

use super::{BookingPage, PaymentStatus};

const STYLE: &str = r#"
        body { background: #f5f5f5; }
        main { max-width: 520px; margin: 60px auto; padding: 32px; background: white;
               border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
        .title { text-align: center; margin-bottom: 24px; }
        .success { color: #155724; background: #d4edda; padding: 12px; border-radius: 4px; }
        .error { color: #721c24; background: #f8d7da; padding: 12px; border-radius: 4px; }
        #card-element { padding: 10px; border: 1px solid #ced4da; border-radius: 4px; }
        footer { text-align: center; color: #888; margin: 24px 0; }
"#;

// Tokenizes the card in the browser and posts only the payment method id.
const SCRIPT: &str = r#"
    (function () {
        var mount = document.getElementById('card-element');
        if (!window.Stripe || !mount) { return; }
        var stripe = Stripe(mount.dataset.key);
        var elements = stripe.elements({ appearance: { theme: 'stripe' } });
        var card = elements.create('card');
        card.mount(mount);

        var form = document.getElementById('booking-form');
        var method = document.getElementById('payment_method');
        var button = document.getElementById('submit');
        form.addEventListener('submit', async function (event) {
            if (method.value) { return; }
            event.preventDefault();
            button.disabled = true;
            button.textContent = 'Processing...';
            var result = await stripe.createPaymentMethod({
                type: 'card',
                card: card,
                billing_details: {
                    name: document.getElementById('name').value,
                    email: document.getElementById('email').value
                }
            });
            if (result.error) {
                alert('Payment failed: ' + result.error.message);
                button.disabled = false;
                button.textContent = 'Book & Pay';
                return;
            }
            method.value = result.paymentMethod.id;
            form.submit();
        });
    })();
"#;

/// Render the whole page. `alert` is shown once above the form.
pub fn render_page(page: &BookingPage, alert: Option<&str>, publishable_key: &str) -> String {
    let status_html = match page.payment_status {
        Some(PaymentStatus::Success) => r#"<div class="success">
            <p>Payment successful!  Your appointment is confirmed. You will receive an email shortly.</p>
        </div>"#,
        Some(PaymentStatus::Error) => r#"<div class="error">
            <p>Payment failed. Please try again.</p>
        </div>"#,
        None => "",
    };

    let alert_html = alert
        .map(|message| {
            format!(
                r#"<div class="alert alert-info" role="alert">{}</div>"#,
                escape(message)
            )
        })
        .unwrap_or_default();

    let placeholder_selected = if page.selected_time.is_none() {
        " selected"
    } else {
        ""
    };
    let options: String = page
        .available_times
        .iter()
        .map(|slot| {
            let selected = if page.selected_time == Some(*slot) {
                " selected"
            } else {
                ""
            };
            format!(
                r#"<option value="{value}"{selected}>{label}</option>"#,
                value = slot,
                label = slot.label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n                ");

    let (button_disabled, button_label) = if page.loading {
        (" disabled", "Processing...")
    } else {
        ("", "Book &amp; Pay")
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Acupuncture Booking</title>
    <link rel="stylesheet" href="https://stackpath.bootstrapcdn.com/bootstrap/4.5.2/css/bootstrap.min.css">
    <style>{style}</style>
    <script src="https://js.stripe.com/v3/"></script>
</head>
<body>
    <main>
        <h1 class="title">Book Your Acupuncture Session</h1>

        {status_html}
        {alert_html}

        <form id="booking-form" method="post" action="/">
            <div class="form-group">
                <label for="name">Name:</label>
                <input type="text" id="name" name="name" class="form-control" value="{name}" required>
            </div>

            <div class="form-group">
                <label for="email">Email:</label>
                <input type="email" id="email" name="email" class="form-control" value="{email}" required>
            </div>

            <div class="form-group">
                <label for="time">Select Appointment Time:</label>
                <select id="time" name="time" class="form-control" required>
                <option value="" disabled{placeholder_selected}>Select a time</option>
                {options}
                </select>
            </div>

            <div class="form-group">
                <label for="card-element">Card:</label>
                <div id="card-element" data-key="{key}"></div>
                <input type="hidden" id="payment_method" name="payment_method" value="">
            </div>

            <button type="submit" id="submit" class="btn btn-primary"{button_disabled}>{button_label}</button>
        </form>
    </main>

    <footer>Powered by Axum and Stripe</footer>
    <script>{script}</script>
</body>
</html>"#,
        style = STYLE,
        script = SCRIPT,
        name = escape(&page.name),
        email = escape(&page.email),
        key = escape(publishable_key),
    )
}

/// Escape text for use in element content and quoted attributes.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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
