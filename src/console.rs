//! Interactive line-oriented front end for the register.
//!
//! Each input line is parsed into a [`Command`] and applied to the
//! [`Register`]. Command failures are reported on the output and logged; they
//! never end the session. Only `q`, `quit` or end of input do.

use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{info, warn};

use crate::money::pesos;
use crate::receipt::{self, ReceiptLayout};
use crate::register::Register;
use crate::store::ShiftStore;
use crate::sync::Synchronizer;

const PROMPT: &str = "Item price: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add an item with this price.
    Amount(u64),
    RemoveLast,
    ShowSales,
    /// Empty line.
    SaveBill,
    CreditNote,
    PrintLast,
    OpenDrawer,
    Sync,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "" => Self::SaveBill,
            "b" => Self::RemoveLast,
            "t" | "-" => Self::ShowSales,
            "nt" => Self::CreditNote,
            "p" | "+" => Self::PrintLast,
            "." => Self::OpenDrawer,
            "s" | "sync" => Self::Sync,
            "h" | "help" => Self::Help,
            "q" | "quit" => Self::Quit,
            digits if digits.bytes().all(|b| b.is_ascii_digit()) => digits
                .parse()
                .map(Self::Amount)
                .unwrap_or_else(|_| Self::Unknown(line.to_string())),
            other => Self::Unknown(other.to_string()),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Amount(_) => "amount",
            Self::RemoveLast => "remove_last",
            Self::ShowSales => "show_sales",
            Self::SaveBill => "save_bill",
            Self::CreditNote => "credit_note",
            Self::PrintLast => "print_last",
            Self::OpenDrawer => "open_drawer",
            Self::Sync => "sync",
            Self::Help => "help",
            Self::Quit => "quit",
            Self::Unknown(_) => "unknown",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Console<R: ShiftStore> {
    register: Register,
    sync: Option<Arc<Synchronizer<R>>>,
    large_amount: f64,
    layout: ReceiptLayout,
}

impl<R: ShiftStore> Console<R> {
    pub fn new(register: Register, sync: Option<Arc<Synchronizer<R>>>, large_amount: f64) -> Self {
        Self {
            register,
            sync,
            large_amount,
            layout: ReceiptLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: ReceiptLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn register(&self) -> &Register {
        &self.register
    }

    /// Read commands from `input` until quit or end of input.
    pub async fn run<I, W>(&mut self, input: I, out: &mut W) -> std::io::Result<()>
    where
        I: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        loop {
            write!(out, "{PROMPT}")?;
            out.flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let command = Command::parse(&line);
            match self.handle(&command, &mut lines, out).await {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => {
                    warn!(command = command.name(), error = %e, "Console command failed");
                    writeln!(out, "Error: {e}")?;
                }
            }
        }
        if self.register.is_bill_open() {
            warn!("Console closed with an unsaved bill");
        }
        Ok(())
    }

    async fn handle<I, W>(
        &mut self,
        command: &Command,
        lines: &mut Lines<I>,
        out: &mut W,
    ) -> anyhow::Result<Flow>
    where
        I: AsyncBufRead + Unpin,
        W: Write,
    {
        match command {
            Command::Amount(0) => writeln!(out, "Amount must be greater than zero")?,
            Command::Amount(amount) => {
                let price = *amount as f64;
                if price >= self.large_amount {
                    writeln!(
                        out,
                        "Type + and press enter to register this amount of {} or more, otherwise press enter",
                        pesos(self.large_amount)
                    )?;
                    let confirm = lines.next_line().await?.unwrap_or_default();
                    if confirm.trim() != "+" {
                        writeln!(out, "Amount discarded")?;
                        return Ok(Flow::Continue);
                    }
                }
                let bill = self.register.add_item(price);
                writeln!(out, "{}", receipt::render_open_bill(Some(bill)))?;
            }
            Command::RemoveLast => {
                self.register.remove_last_item();
                writeln!(out, "{}", receipt::render_open_bill(self.register.current_bill()))?;
            }
            Command::ShowSales => {
                let shift = self.register.daily_shift().await?;
                if !shift.has_bills() {
                    anyhow::bail!("no sales yet today");
                }
                let offset = self.register.clock().offset();
                writeln!(out, "{}", receipt::render_daily_sales(&shift, offset))?;
            }
            Command::SaveBill => {
                if let Some(shift) = self.register.save_bill().await? {
                    writeln!(out, "Bill saved. Today: {}", pesos(shift.total()))?;
                }
                open_drawer(out)?;
            }
            Command::CreditNote => {
                write!(out, "Credit note value: ")?;
                out.flush()?;
                let raw = lines.next_line().await?.unwrap_or_default();
                let value: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid value {:?}", raw.trim()))?;
                let shift = self.register.credit_note(value).await?;
                writeln!(out, "Credit note saved. Today: {}", pesos(shift.total()))?;
            }
            Command::PrintLast => {
                let Some(bill) = self.register.last_saved_bill().await? else {
                    anyhow::bail!("no saved bill today");
                };
                let clock = self.register.clock();
                let printed_at = chrono::DateTime::<chrono::Utc>::from_timestamp_nanos(clock.now_nanos())
                    .with_timezone(&clock.offset());
                writeln!(out, "{}", receipt::render_receipt(&bill, printed_at, &self.layout))?;
            }
            Command::OpenDrawer => open_drawer(out)?,
            Command::Sync => match &self.sync {
                Some(sync) => {
                    writeln!(out, "Starting manual sync...")?;
                    let report = sync.sync_pass().await?;
                    writeln!(
                        out,
                        "Sync complete: {} day(s) synced, {} failed",
                        report.synced.len(),
                        report.failed.len()
                    )?;
                }
                None => writeln!(out, "Sync unavailable: no remote store configured")?,
            },
            Command::Help => writeln!(out, "{}", receipt::render_help())?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Unknown(_) => writeln!(out, "Command not found")?,
        }
        Ok(Flow::Continue)
    }
}

fn open_drawer<W: Write>(out: &mut W) -> std::io::Result<()> {
    info!("Drawer opened");
    writeln!(out, "[drawer open]")
}
