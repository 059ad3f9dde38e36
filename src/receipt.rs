//! Plain-text rendering of bills and shifts for the console.

use chrono::{DateTime, FixedOffset};

use crate::model::{Bill, DailyShift};
use crate::money::pesos;

const RULE: &str = "+++++++++++++";

#[derive(Debug, Clone)]
pub struct ReceiptLayout {
    /// Characters per line.
    pub width: usize,
    pub header: Vec<String>,
    pub footer: Vec<String>,
}

impl Default for ReceiptLayout {
    fn default() -> Self {
        Self {
            width: 32,
            header: vec!["BILL OF SALE".to_string()],
            footer: vec![
                "THANK YOU FOR YOUR PURCHASE".to_string(),
                "COME BACK SOON!".to_string(),
            ],
        }
    }
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let pad = (width - len) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

fn pair(label: &str, value: &str, width: usize) -> String {
    let used = label.chars().count() + value.chars().count();
    if used < width {
        format!("{label}{}{value}", " ".repeat(width - used))
    } else {
        format!("{label} {value}")
    }
}

/// Items of the bill being built, with its running subtotal.
pub fn render_open_bill(bill: Option<&Bill>) -> String {
    let mut out = vec![RULE.to_string(), "ITEMS".to_string()];
    let subtotal = match bill {
        Some(bill) => {
            out.extend(bill.items().iter().map(|item| pesos(item.price)));
            bill.total()
        }
        None => 0.0,
    };
    out.push(format!("Subtotal: {}", pesos(subtotal)));
    out.push(RULE.to_string());
    out.join("\n")
}

/// One line per bill of the day (`id | total | HH:MM:SS`) and the day total.
pub fn render_daily_sales(shift: &DailyShift, offset: FixedOffset) -> String {
    let mut out = vec![
        RULE.to_string(),
        "TOTAL SALES".to_string(),
        "Id  |  Amount  |  Time".to_string(),
    ];
    for bill in shift.bills() {
        out.push(format!(
            "{}  {}  {}",
            bill.id,
            pesos(bill.total()),
            bill.time_of_day(offset)
        ));
    }
    out.push(format!("Total: {}", pesos(shift.total())));
    out.push(RULE.to_string());
    out.join("\n")
}

pub fn render_receipt(bill: &Bill, printed_at: DateTime<FixedOffset>, layout: &ReceiptLayout) -> String {
    let width = layout.width;
    let mut out: Vec<String> = layout.header.iter().map(|l| center(l, width)).collect();
    out.push(center(&printed_at.format("%d-%m-%Y %H:%M:%S").to_string(), width));
    out.push(String::new());
    out.push("Items:".to_string());
    for item in bill.items() {
        out.push(pair("", &pesos(item.price), width));
    }
    out.push("-".repeat(width));
    out.push(pair("Total", &pesos(bill.total()), width));
    out.push(String::new());
    out.extend(layout.footer.iter().map(|l| center(l, width)));
    out.join("\n")
}

pub fn render_help() -> String {
    [
        RULE,
        "AVAILABLE COMMANDS",
        "[number]  add an item with that price",
        "b         remove the last item",
        "t | -     show today's sales",
        "[enter]   save the current bill",
        "nt        enter a credit note",
        "p | +     print the last bill",
        ".         open the drawer",
        "s | sync  sync with the remote store now",
        "h | help  show this list",
        "q | quit  exit",
        RULE,
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Item;
    use chrono::TimeZone;

    fn bill() -> Bill {
        // 2024-01-01 15:30:00 UTC
        let mut bill = Bill::with_id("b-1", 1_704_123_000 * 1_000_000_000);
        bill.add_item(Item::priced(12_500.0));
        bill.add_item(Item::priced(3_000.0));
        bill
    }

    #[test]
    fn open_bill_lists_items_and_subtotal() {
        let text = render_open_bill(Some(&bill()));
        assert!(text.contains("$ 12,500\n$ 3,000\nSubtotal: $ 15,500"));
        assert!(render_open_bill(None).contains("Subtotal: $ 0"));
    }

    #[test]
    fn daily_sales_uses_business_time() {
        let mut shift = DailyShift::new(1_704_085_200);
        shift.add_bill(bill());
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();

        let text = render_daily_sales(&shift, offset);
        assert!(text.contains("b-1  $ 15,500  10:30:00"));
        assert!(text.contains("Total: $ 15,500"));
    }

    #[test]
    fn receipt_aligns_total_to_width() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let at = offset.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap();
        let layout = ReceiptLayout::default();

        let text = render_receipt(&bill(), at, &layout);
        let total_line = text.lines().find(|l| l.starts_with("Total")).unwrap();

        assert_eq!(total_line.chars().count(), layout.width);
        assert!(total_line.ends_with("$ 15,500"));
        assert!(text.contains("01-01-2024 10:30:00"));
        assert!(text.ends_with("COME BACK SOON!"));
    }
}
