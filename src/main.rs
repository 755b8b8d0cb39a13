use clap::Parser;
use miette::{IntoDiagnostic, Result};
use settleflow::application::admin::AdminDesk;
use settleflow::application::checkout::{CheckoutFlow, CheckoutRequest};
use settleflow::application::ledger::OrderLedger;
use settleflow::application::settlement::SettlementDispatcher;
use settleflow::config::{AutomatedGatewayConfig, HostedCheckoutConfig, ManualTransferConfig};
use settleflow::domain::affiliate::AffiliateProfile;
use settleflow::domain::event::{CanonicalEvent, ExternalStatus, Instrument};
use settleflow::domain::money::Amount;
use settleflow::domain::order::{OrderTarget, PaymentType};
use settleflow::domain::product::Product;
use settleflow::domain::project::Project;
use settleflow::error::PaymentError;
use settleflow::gateways::GatewayRegistry;
use settleflow::gateways::automated::AutomatedGatewayAdapter;
use settleflow::gateways::hosted::HostedCheckoutAdapter;
use settleflow::gateways::manual::ManualTransferAdapter;
use settleflow::infrastructure::in_memory::InMemoryStores;
use settleflow::infrastructure::rails::{SimAutomatedRail, SimCheckoutProvider};
use settleflow::interfaces::csv::op_reader::{OpKind, OpReader, OpRecord};
use settleflow::interfaces::csv::report_writer::ReportWriter;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    input: PathBuf,

    /// Settlement currency applied to every order
    #[arg(long, default_value = "IDR")]
    currency: String,
}

/// Everything an op replay needs, plus the alias map that lets ops refer to
/// orders by the caller-chosen name from their `checkout` line.
struct Replay {
    stores: InMemoryStores,
    ledger: Arc<OrderLedger>,
    flow: CheckoutFlow,
    admin: AdminDesk,
    dispatcher: Arc<SettlementDispatcher>,
    aliases: HashMap<String, String>,
}

impl Replay {
    fn order_id(&self, alias: &str) -> settleflow::error::Result<String> {
        self.aliases.get(alias).cloned().ok_or_else(|| {
            PaymentError::ValidationError(format!("unknown order alias: {alias}"))
        })
    }

    async fn apply(&mut self, record: OpRecord) -> settleflow::error::Result<()> {
        match record.op {
            OpKind::Project => {
                let client = require(record.target, "target")?;
                let total = Amount::new(require(record.amount, "amount")?)?;
                self.stores
                    .projects()
                    .store(Project::new(record.id, client, total))
                    .await
            }
            OpKind::Product => {
                let name = require(record.target, "target")?;
                let price = Amount::new(require(record.amount, "amount")?)?;
                self.stores
                    .products()
                    .store(Product::new(record.id, name, price))
                    .await
            }
            OpKind::Affiliate => {
                let rate = require(record.rate, "rate")?;
                self.stores
                    .affiliates()
                    .store(AffiliateProfile::new(record.id, rate))
                    .await
            }
            OpKind::Checkout => {
                let target = parse_target(&require(record.target, "target")?)?;
                let payment_type = parse_payment_type(&require(record.payment_type, "payment_type")?)?;
                let response = self
                    .flow
                    .open(CheckoutRequest {
                        target,
                        payment_type,
                        coupon_code: None,
                        affiliate_id: record.affiliate,
                        instrument: None,
                    })
                    .await?;
                self.aliases.insert(record.id, response.order_id);
                Ok(())
            }
            OpKind::Select => {
                let order_id = self.order_id(&record.id)?;
                let instrument = parse_instrument(&require(record.instrument, "instrument")?)?;
                self.flow.select_instrument(&order_id, instrument).await?;
                Ok(())
            }
            OpKind::Event => {
                let order_id = self.order_id(&record.id)?;
                let status = parse_status(&require(record.status, "status")?)?;
                let outcome = self
                    .ledger
                    .apply_external_event(&order_id, CanonicalEvent::new(&order_id, status))
                    .await?;
                if outcome.entered_success() {
                    self.dispatcher.dispatch(&order_id).await?;
                }
                Ok(())
            }
            OpKind::Confirm => {
                let order_id = self.order_id(&record.id)?;
                self.admin.confirm_order(&order_id).await.map(drop)
            }
            OpKind::Reject => {
                let order_id = self.order_id(&record.id)?;
                let reason = record.target.unwrap_or_else(|| "rejected".to_string());
                self.admin.reject_order(&order_id, &reason).await.map(drop)
            }
        }
    }
}

fn require<T>(field: Option<T>, name: &str) -> settleflow::error::Result<T> {
    field.ok_or_else(|| PaymentError::ValidationError(format!("missing column: {name}")))
}

fn parse_target(raw: &str) -> settleflow::error::Result<OrderTarget> {
    match raw.split_once(':') {
        Some(("project", id)) => Ok(OrderTarget::Project {
            project_id: id.to_string(),
        }),
        Some(("product", id)) => Ok(OrderTarget::Product {
            product_id: id.to_string(),
        }),
        _ => Err(PaymentError::ValidationError(format!(
            "target must be project:<id> or product:<id>, got: {raw}"
        ))),
    }
}

fn parse_payment_type(raw: &str) -> settleflow::error::Result<PaymentType> {
    match raw {
        "full" => Ok(PaymentType::Full),
        "dp" => Ok(PaymentType::Dp),
        "repayment" => Ok(PaymentType::Repayment),
        other => Err(PaymentError::InvalidPaymentTypeError(other.to_string())),
    }
}

fn parse_instrument(raw: &str) -> settleflow::error::Result<Instrument> {
    let instrument = match raw.split_once(':') {
        Some(("virtual_account", bank)) => Instrument::VirtualAccount {
            bank: bank.to_string(),
        },
        Some(("ewallet", provider)) => Instrument::Ewallet {
            provider: provider.to_string(),
        },
        Some(("cstore", chain)) => Instrument::ConvenienceStore {
            chain: chain.to_string(),
        },
        None => match raw {
            "manual_transfer" => Instrument::ManualTransfer,
            "qris" => Instrument::Qris,
            "direct_debit" => Instrument::DirectDebit,
            "hosted_checkout" => Instrument::HostedCheckout,
            other => {
                return Err(PaymentError::ValidationError(format!(
                    "unknown instrument: {other}"
                )));
            }
        },
        Some((other, _)) => {
            return Err(PaymentError::ValidationError(format!(
                "unknown instrument: {other}"
            )));
        }
    };
    Ok(instrument)
}

fn parse_status(raw: &str) -> settleflow::error::Result<ExternalStatus> {
    match raw {
        "acknowledged" => Ok(ExternalStatus::Acknowledged),
        "proof_submitted" => Ok(ExternalStatus::ProofSubmitted),
        "paid" => Ok(ExternalStatus::Paid),
        "settled" => Ok(ExternalStatus::Settled),
        "failed" => Ok(ExternalStatus::Failed),
        "expired" => Ok(ExternalStatus::Expired),
        other => Err(PaymentError::ValidationError(format!(
            "unknown status: {other}"
        ))),
    }
}

fn build(currency: &str) -> Replay {
    let stores = InMemoryStores::new();

    let registry = Arc::new(GatewayRegistry::new());
    registry.register(Arc::new(ManualTransferAdapter::new(ManualTransferConfig {
        bank_name: "Bank Central".to_string(),
        account_number: "1234567890".to_string(),
        account_holder: "Settleflow Ltd".to_string(),
    })));
    registry.register(Arc::new(AutomatedGatewayAdapter::new(
        Arc::new(SimAutomatedRail::new()),
        AutomatedGatewayConfig::new("sim-server-key"),
    )));
    let hosted = Arc::new(HostedCheckoutAdapter::new(
        Arc::new(SimCheckoutProvider::new()),
        HostedCheckoutConfig::new("sim-api-key", "sim-webhook-secret"),
    ));
    registry.register(hosted.clone());

    let ledger = Arc::new(OrderLedger::new(
        stores.orders(),
        stores.projects(),
        stores.products(),
        currency,
    ));
    let dispatcher = Arc::new(SettlementDispatcher::new(
        stores.orders(),
        stores.projects(),
        stores.products(),
        stores.licenses(),
        stores.affiliates(),
        stores.commissions(),
        stores.notifier(),
    ));
    let flow = CheckoutFlow::new(ledger.clone(), registry.clone());
    let admin = AdminDesk::new(
        ledger.clone(),
        dispatcher.clone(),
        stores.products(),
        stores.affiliates(),
        stores.payouts(),
        Some(hosted),
    );

    Replay {
        stores,
        ledger,
        flow,
        admin,
        dispatcher,
        aliases: HashMap::new(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut replay = build(&cli.currency);

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = OpReader::new(file);
    for op_result in reader.ops() {
        match op_result {
            Ok(record) => {
                if let Err(e) = replay.apply(record).await {
                    eprintln!("Error applying operation: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {}", e);
            }
        }
    }

    let orders = replay.stores.orders().all().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_orders(orders.iter()).into_diagnostic()?;

    Ok(())
}
