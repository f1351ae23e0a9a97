use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pg_scout::api::{
    ApiClient, ContactApi, ContactMessage, ContentRepository, ListingRepository,
    RoomBookingRepository, RoomBookingRequest, VisitMode,
};
use pg_scout::booking::{SubmitOutcome, VisitBookingFlow};
use pg_scout::catalog::{CatalogEngine, CatalogStatus, Facet, SortState};
use pg_scout::config::Config;
use pg_scout::maps::{self, MapSurface};
use pg_scout::models::{BookingStatus, Listing, RoomBooking};
use pg_scout::session::SessionStore;
use pg_scout::ApiError;

#[derive(Parser)]
#[command(name = "pg-scout", about = "Find, compare and book PG/hostel stays")]
struct Cli {
    /// Overrides PG_SCOUT_API_BASE_URL
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the catalog
    Search {
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(long, default_value = "")]
        city: String,
        #[arg(long, default_value = "")]
        gender: String,
        /// Facet filter as `facet=value`, e.g. `sharingType=double` (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
        /// availability | price-asc | price-desc | rating-desc | rating-asc
        #[arg(short, long, default_value = "availability")]
        sort: SortState,
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one listing
    Show { id: String },
    /// Print supporting site content
    Content {
        #[arg(value_enum)]
        kind: ContentKind,
    },
    /// Schedule a visit (asks for an OTP when not signed in)
    Visit {
        #[arg(long)]
        property_id: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        time: String,
        #[arg(long)]
        mode: Option<VisitMode>,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Room bookings
    Booking {
        #[command(subcommand)]
        action: BookingAction,
    },
    /// Send a message to the support team
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        message: String,
    },
    /// Forget the stored session
    Logout,
}

#[derive(Subcommand)]
enum BookingAction {
    Create {
        #[command(flatten)]
        details: BookingDetails,
    },
    Get {
        id: String,
    },
    Update {
        id: String,
        #[command(flatten)]
        details: BookingDetails,
    },
    Status {
        id: String,
        status: BookingStatus,
    },
    List {
        #[arg(long)]
        user: String,
    },
}

#[derive(clap::Args)]
struct BookingDetails {
    #[arg(long)]
    property_id: String,
    #[arg(long)]
    user_id: Option<String>,
    #[arg(long)]
    check_in: NaiveDate,
    #[arg(long)]
    check_out: Option<NaiveDate>,
    #[arg(long)]
    sharing_type: Option<String>,
}

impl From<BookingDetails> for RoomBookingRequest {
    fn from(details: BookingDetails) -> Self {
        Self {
            property_id: details.property_id,
            user_id: details.user_id,
            check_in: details.check_in,
            check_out: details.check_out,
            sharing_type: details.sharing_type,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ContentKind {
    Banners,
    Faqs,
    Testimonials,
    Cities,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pg_scout=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env(cli.api_base_url)?;

    let session = match &config.session_file {
        Some(path) => SessionStore::load(path).await?,
        None => SessionStore::in_memory(),
    };
    let client = Arc::new(ApiClient::new(&config)?.with_session(session.clone()));

    match cli.command {
        Command::Search {
            query,
            city,
            gender,
            filters,
            sort,
            page,
            json,
        } => {
            let mut engine = CatalogEngine::load(client.as_ref()).await;
            engine.set_search(query);
            engine.set_url_constraints(city, gender);
            for raw in &filters {
                let (facet, value) = parse_filter(raw)?;
                engine.set_filter(facet, value);
            }
            engine.set_sort(sort);
            go_to_page(&mut engine, page)?;
            print_catalog(&engine, json)?;
        }
        Command::Show { id } => match client.fetch_listing(&id).await {
            Ok(listing) => {
                let surface = MapSurface::from_key(config.maps_api_key.as_deref());
                print_listing(&listing, &surface);
            }
            Err(ApiError::NotFound { .. }) => println!("🔍 No listing with id {id}"),
            Err(e) => return Err(e).context("Failed to load listing"),
        },
        Command::Content { kind } => print_content(client.as_ref(), kind).await?,
        Command::Visit {
            property_id,
            date,
            time,
            mode,
            name,
            phone,
            description,
        } => {
            let mut flow = VisitBookingFlow::new(client.clone(), client.clone(), session.clone());
            if let Some(property_id) = property_id {
                flow = flow.for_property(property_id);
            }
            flow.set_date(date);
            flow.set_time_slot(time);
            flow.set_mode(mode);
            flow.set_name(name);
            flow.set_phone(phone);
            flow.set_description(description);
            run_visit_flow(&mut flow).await?;
        }
        Command::Booking { action } => run_booking_action(client.as_ref(), action).await?,
        Command::Contact {
            name,
            email,
            phone,
            message,
        } => {
            let ack = client
                .send_message(&ContactMessage {
                    name,
                    email,
                    phone,
                    message,
                })
                .await
                .context("Failed to send message")?;
            println!(
                "✅ {}",
                ack.message.unwrap_or_else(|| "Message sent".to_string())
            );
        }
        Command::Logout => {
            session.sign_out().await;
            println!("👋 Signed out");
        }
    }

    Ok(())
}

/// Paging only applies to a result list; a failed or empty catalog keeps
/// its status message.
fn go_to_page(engine: &mut CatalogEngine, page: usize) -> Result<()> {
    if page != 1 && engine.view().status == CatalogStatus::Results {
        engine.set_page(page)?;
    }
    Ok(())
}

fn parse_filter(raw: &str) -> Result<(Facet, String)> {
    let (facet, value) = raw
        .split_once('=')
        .with_context(|| format!("Filter must look like facet=value, got {raw}"))?;
    let facet = facet.parse::<Facet>().map_err(anyhow::Error::msg)?;
    Ok((facet, value.to_string()))
}

fn print_catalog(engine: &CatalogEngine, json: bool) -> Result<()> {
    let view = engine.view();

    match &view.status {
        CatalogStatus::Error(message) => {
            println!("❌ Could not load listings: {message}");
            println!("   Try again in a moment.");
            return Ok(());
        }
        CatalogStatus::Empty => {
            println!("🏠 No properties are listed yet.");
            return Ok(());
        }
        CatalogStatus::NoMatches => {
            println!("🔍 No properties match your search.");
            println!("   Clear the filters to see all listings.");
            return Ok(());
        }
        CatalogStatus::Results => {}
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&view.items)?);
        return Ok(());
    }

    info!(
        "Showing page {}/{} of {} matching listings (sort: {})",
        view.page,
        view.total_pages,
        view.filtered_count,
        engine.sort()
    );

    let offset = (view.page - 1) * pg_scout::catalog::PAGE_SIZE;
    for (i, listing) in view.items.iter().enumerate() {
        let price = listing
            .price
            .map(|p| format!("₹{p:.0}/month"))
            .unwrap_or_else(|| "price on request".to_string());
        println!("{}. {} ({})", offset + i + 1, listing.title, price);
        println!("   {}, {}", listing.location.address, listing.location.city);
        println!(
            "   {} · {} · sharing: {}",
            listing.property_type,
            listing.gender,
            listing.sharing_types.join(", ")
        );
        if let Some(rating) = listing.rating {
            println!("   ★ {:.1} ({} reviews)", rating.average, rating.count);
        }
        if !listing.available {
            println!("   Currently full");
        }
        println!("   ID: {}", listing.id);
        println!();
    }

    if view.has_next() {
        println!("More results: --page {}", view.page + 1);
    }
    Ok(())
}

fn print_listing(listing: &Listing, map: &MapSurface) {
    println!("{}", listing.title);
    println!("{}, {}", listing.location.address, listing.location.city);
    if let Some(price) = listing.price {
        println!("₹{price:.0}/month");
    }
    println!(
        "{} · {} · {} bed / {} bath",
        listing.property_type, listing.gender, listing.bedrooms, listing.bathrooms
    );
    if !listing.sharing_types.is_empty() {
        println!("Sharing: {}", listing.sharing_types.join(", "));
    }
    if !listing.amenities.is_empty() {
        println!("Amenities: {}", listing.amenities.join(", "));
    }
    if let Some(rating) = listing.rating {
        println!("★ {:.1} ({} reviews)", rating.average, rating.count);
    }
    println!(
        "{}",
        if listing.available {
            "Beds available"
        } else {
            "Currently full"
        }
    );

    match map {
        MapSurface::Placeholder { reason } => println!("🗺  {reason}"),
        MapSurface::Provider { .. } => match maps::markers([listing]).first() {
            Some(marker) => println!(
                "🗺  {:.5}, {:.5}",
                marker.position.lat, marker.position.lng
            ),
            None => println!("🗺  Location not pinned on the map"),
        },
    }
}

async fn print_content(client: &ApiClient, kind: ContentKind) -> Result<()> {
    match kind {
        ContentKind::Banners => {
            for banner in client.banners().await? {
                println!("{} {}", banner.title, banner.image_url);
            }
        }
        ContentKind::Faqs => {
            for faq in client.faqs().await? {
                println!("Q: {}\nA: {}\n", faq.question, faq.answer);
            }
        }
        ContentKind::Testimonials => {
            for t in client.testimonials().await? {
                println!("\"{}\" - {}", t.message, t.name);
            }
        }
        ContentKind::Cities => {
            for city in client.cities().await? {
                match city.property_count {
                    Some(count) => println!("{} ({count})", city.name),
                    None => println!("{}", city.name),
                }
            }
        }
    }
    Ok(())
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    Ok(lines
        .next_line()
        .await
        .context("Failed to read from stdin")?
        .unwrap_or_default())
}

async fn run_visit_flow(flow: &mut VisitBookingFlow) -> Result<()> {
    let mut outcome = flow.submit().await;

    if matches!(outcome, SubmitOutcome::VerificationRequired) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        if let Err(e) = flow.send_otp().await {
            flow.cancel_verification();
            bail!("Could not send OTP: {}", e.user_message());
        }
        println!("📱 OTP sent. Check your phone.");

        outcome = loop {
            let input = prompt(&mut lines, "Enter the 6-digit OTP ('resend' or 'cancel'): ").await?;
            match input.trim() {
                "cancel" => {
                    flow.cancel_verification();
                    bail!("Verification cancelled; nothing was booked");
                }
                "resend" => match flow.send_otp().await {
                    Ok(()) => println!("📱 OTP sent again."),
                    Err(e) => warn!("Resend failed: {}", e),
                },
                code => {
                    if let Some(otp) = flow.otp_mut() {
                        otp.cells_mut().clear();
                        otp.cells_mut().enter(code);
                    }
                    match flow.verify_otp().await {
                        Ok(outcome) => break outcome,
                        Err(e) => println!("❌ {}", e.user_message()),
                    }
                }
            }
        };
    }

    let notice = flow.notice().cloned();
    match outcome {
        SubmitOutcome::Booked => {
            if let Some(notice) = notice {
                println!("✅ {}: {}", notice.title, notice.message);
            }
            Ok(())
        }
        SubmitOutcome::Invalid(e) => bail!("{e}"),
        SubmitOutcome::Failed(e) => bail!("Booking Failed: {}", e.user_message()),
        SubmitOutcome::VerificationRequired => bail!("Phone verification is still pending"),
    }
}

fn print_booking(booking: &RoomBooking) {
    println!(
        "{}  property {}  check-in {}  {:?}",
        booking.id, booking.property_id, booking.check_in, booking.status
    );
}

async fn run_booking_action(client: &ApiClient, action: BookingAction) -> Result<()> {
    match action {
        BookingAction::Create { details } => {
            let booking = client.create_booking(&details.into()).await?;
            println!("✅ Booking created");
            print_booking(&booking);
        }
        BookingAction::Get { id } => print_booking(&client.booking(&id).await?),
        BookingAction::Update { id, details } => {
            let booking = client.replace_booking(&id, &details.into()).await?;
            print_booking(&booking);
        }
        BookingAction::Status { id, status } => {
            let booking = client.update_booking_status(&id, status).await?;
            print_booking(&booking);
        }
        BookingAction::List { user } => {
            let bookings = client.user_bookings(&user).await?;
            if bookings.is_empty() {
                println!("No bookings yet.");
            }
            for booking in &bookings {
                print_booking(booking);
            }
        }
    }
    Ok(())
}
