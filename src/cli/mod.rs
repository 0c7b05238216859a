//! CLI argument definitions and parsing.

pub mod types;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use types::ids::{
    BidId, DropId, LeagueId, MasterGameId, PublisherGameId, PublisherId, TradeId, UserId,
};
use types::time::{LeagueYearKey, Year, YearQuarter};

/// League season shared by every league-scoped command.
#[derive(Debug, Clone, Copy, Args)]
pub struct LeagueYearArgs {
    /// League ID.
    #[clap(long, short)]
    pub league_id: LeagueId,

    /// Season year (e.g. 2026).
    #[clap(long, short, default_value_t = Year::default())]
    pub year: Year,
}

impl LeagueYearArgs {
    pub fn key(&self) -> LeagueYearKey {
        LeagueYearKey::new(self.league_id, self.year)
    }
}

/// The user acting on the command.
#[derive(Debug, Clone, Copy, Args)]
pub struct UserArgs {
    /// Acting user ID (or set `FANTASY_CRITIC_USER_ID` env var).
    #[clap(long, short)]
    pub user: Option<UserId>,
}

/// Roster sizes accepted by `league create` and `league options`.
#[derive(Debug, Clone, Default, Args)]
pub struct RosterArgs {
    /// Number of standard game slots.
    #[clap(long)]
    pub standard_games: Option<usize>,

    /// Standard games drafted by each publisher.
    #[clap(long)]
    pub games_to_draft: Option<usize>,

    /// Number of counter pick slots.
    #[clap(long)]
    pub counter_picks: Option<usize>,

    /// Counter picks drafted by each publisher.
    #[clap(long)]
    pub counter_picks_to_draft: Option<usize>,

    /// Smallest bid the league accepts.
    #[clap(long)]
    pub minimum_bid: Option<u32>,
}

#[derive(Debug, Parser)]
#[clap(name = "fantasy-critic", about = "Fantasy Critic league manager")]
pub struct FantasyCritic {
    /// Output results as JSON instead of text lines.
    #[clap(long, global = true)]
    pub json: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the database and open a year for play
    Init {
        /// Year to open (e.g. 2026).
        #[clap(long, short, default_value_t = Year::default())]
        year: Year,
    },

    /// Manage users
    User {
        #[clap(subcommand)]
        cmd: UserCmd,
    },

    /// Manage supported years
    Year {
        #[clap(subcommand)]
        cmd: YearCmd,
    },

    /// Manage the master game list
    Game {
        #[clap(subcommand)]
        cmd: GameCmd,
    },

    /// Create and configure leagues
    League {
        #[clap(subcommand)]
        cmd: LeagueCmd,
    },

    /// Manage publishers in a league year
    Publisher {
        #[clap(subcommand)]
        cmd: PublisherCmd,
    },

    /// Run the draft
    Draft {
        #[clap(subcommand)]
        cmd: DraftCmd,
    },

    /// Pickup bids
    Bid {
        #[clap(subcommand)]
        cmd: BidCmd,
    },

    /// Drop requests
    Drop {
        #[clap(subcommand)]
        cmd: DropCmd,
    },

    /// Auto-draft watchlist
    Queue {
        #[clap(subcommand)]
        cmd: QueueCmd,
    },

    /// Trades between publishers
    Trade {
        #[clap(subcommand)]
        cmd: TradeCmd,
    },

    /// Special auctions on a single game
    Auction {
        #[clap(subcommand)]
        cmd: AuctionCmd,
    },

    /// Process pending bids, drops and auctions
    Process {
        #[clap(subcommand)]
        cmd: ProcessCmd,
    },

    /// Quarterly Royale play
    Royale {
        #[clap(subcommand)]
        cmd: RoyaleCmd,
    },

    /// League standings by total fantasy points
    Standings {
        #[clap(flatten)]
        league: LeagueYearArgs,
    },

    /// Run special auctions and Royale point updates on a timer.
    ///
    /// The interval comes from `schedule_interval_secs` in the config file.
    Schedule {
        /// Run a single pass and exit.
        #[clap(long)]
        once: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum UserCmd {
    /// Register a user and print their ID
    Add {
        /// Display name.
        name: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum YearCmd {
    /// Open a new year for league creation and play
    Add { year: Year },

    /// Close a year and lock in final scores
    Finish { year: Year },

    /// List supported years
    List,
}

#[derive(Debug, Subcommand)]
pub enum GameCmd {
    /// Add a master game
    Add {
        name: String,

        /// Earliest possible release date (YYYY-MM-DD).
        #[clap(long)]
        min_release: NaiveDate,

        /// Latest possible release date (YYYY-MM-DD).
        #[clap(long)]
        max_release: Option<NaiveDate>,

        /// Confirmed release date (YYYY-MM-DD).
        #[clap(long)]
        release: Option<NaiveDate>,

        /// OpenCritic game ID.
        #[clap(long)]
        opencritic_id: Option<u32>,

        /// Tag names (repeatable): `--tag Port --tag Remaster`.
        #[clap(long = "tag")]
        tags: Vec<String>,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Set or clear a game's critic score and release date
    Score {
        id: MasterGameId,

        /// Critic score; omit to clear.
        #[clap(long)]
        score: Option<f64>,

        /// Release date (YYYY-MM-DD).
        #[clap(long)]
        release: Option<NaiveDate>,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Show one game with its statistics for a year
    Show {
        id: MasterGameId,

        #[clap(long, short, default_value_t = Year::default())]
        year: Year,
    },

    /// List games that could release in a year
    List {
        #[clap(long, short, default_value_t = Year::default())]
        year: Year,
    },

    /// Pull critic scores from OpenCritic for every linked game
    RefreshCritic,

    /// Recompute draft percentages, hype and site-wide averages
    RefreshStats {
        #[clap(long, short, default_value_t = Year::default())]
        year: Year,
    },
}

#[derive(Debug, Subcommand)]
pub enum LeagueCmd {
    /// Create a league and its first year
    Create {
        name: String,

        #[clap(long, short, default_value_t = Year::default())]
        year: Year,

        /// Exclude this league from site statistics.
        #[clap(long)]
        test: bool,

        /// List the league publicly.
        #[clap(long)]
        public: bool,

        #[clap(flatten)]
        roster: RosterArgs,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Start a new year, carrying options and active players forward
    AddYear {
        #[clap(flatten)]
        league: LeagueYearArgs,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Join a league as a member
    Join {
        #[clap(long, short)]
        league_id: LeagueId,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Mark a member as playing (or sitting out) this year
    Activate {
        #[clap(flatten)]
        league: LeagueYearArgs,

        /// Member to change.
        #[clap(long)]
        player: UserId,

        /// Set the player inactive instead.
        #[clap(long)]
        inactive: bool,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Change roster options for a year
    Options {
        #[clap(flatten)]
        league: LeagueYearArgs,

        #[clap(flatten)]
        roster: RosterArgs,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Show a league year with its publishers
    Show {
        #[clap(flatten)]
        league: LeagueYearArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum PublisherCmd {
    /// Create your publisher for a league year
    Create {
        #[clap(flatten)]
        league: LeagueYearArgs,

        name: String,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Manager edit of a publisher's name, budget or drop counters
    Edit {
        #[clap(flatten)]
        league: LeagueYearArgs,

        publisher: PublisherId,

        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        budget: Option<i32>,

        #[clap(long)]
        free_games_dropped: Option<i32>,

        #[clap(long)]
        will_not_release_games_dropped: Option<i32>,

        #[clap(long)]
        will_release_games_dropped: Option<i32>,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Manager removal of a publisher game
    Remove {
        #[clap(flatten)]
        league: LeagueYearArgs,

        publisher_game: PublisherGameId,

        #[clap(flatten)]
        user: UserArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum DraftCmd {
    /// Set the draft order (repeatable): `--publisher A --publisher B`
    Order {
        #[clap(flatten)]
        league: LeagueYearArgs,

        #[clap(long = "publisher", required = true)]
        publishers: Vec<PublisherId>,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Start the draft
    Start {
        #[clap(flatten)]
        league: LeagueYearArgs,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Draft a game for your publisher
    Pick {
        #[clap(flatten)]
        league: LeagueYearArgs,

        game: MasterGameId,

        #[clap(long)]
        counter_pick: bool,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Pause the draft
    Pause {
        #[clap(flatten)]
        league: LeagueYearArgs,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Resume a paused draft
    Resume {
        #[clap(flatten)]
        league: LeagueYearArgs,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Undo the most recent pick of a paused draft
    Undo {
        #[clap(flatten)]
        league: LeagueYearArgs,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Remove every drafted game and return to the start of the draft
    Reset {
        #[clap(flatten)]
        league: LeagueYearArgs,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Make pending auto-draft picks
    Auto {
        #[clap(flatten)]
        league: LeagueYearArgs,
    },

    /// Show the draft phase and who is up
    Status {
        #[clap(flatten)]
        league: LeagueYearArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum BidCmd {
    /// Place a pickup bid
    Place {
        #[clap(flatten)]
        league: LeagueYearArgs,

        publisher: PublisherId,

        game: MasterGameId,

        amount: u32,

        #[clap(long)]
        counter_pick: bool,

        /// Publisher game to drop if the bid wins.
        #[clap(long)]
        conditional_drop: Option<PublisherGameId>,

        #[clap(long)]
        allow_ineligible_slot: bool,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Withdraw a pickup bid
    Remove {
        #[clap(flatten)]
        league: LeagueYearArgs,

        bid: BidId,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Reorder your bids (repeatable): `--bid A --bid B`
    Priority {
        #[clap(flatten)]
        league: LeagueYearArgs,

        publisher: PublisherId,

        #[clap(long = "bid", required = true)]
        bids: Vec<BidId>,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// List a publisher's active bids
    List {
        #[clap(flatten)]
        league: LeagueYearArgs,

        publisher: PublisherId,
    },
}

#[derive(Debug, Subcommand)]
pub enum DropCmd {
    /// Ask to drop a publisher game at the next processing run
    Request {
        #[clap(flatten)]
        league: LeagueYearArgs,

        publisher: PublisherId,

        publisher_game: PublisherGameId,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Withdraw a drop request
    Remove {
        #[clap(flatten)]
        league: LeagueYearArgs,

        drop: DropId,

        #[clap(flatten)]
        user: UserArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum QueueCmd {
    /// Add a game to the end of your queue
    Add {
        #[clap(flatten)]
        league: LeagueYearArgs,

        publisher: PublisherId,

        game: MasterGameId,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Reorder your queue (repeatable): `--game A --game B`
    Rank {
        #[clap(flatten)]
        league: LeagueYearArgs,

        publisher: PublisherId,

        #[clap(long = "game", required = true)]
        games: Vec<MasterGameId>,

        #[clap(flatten)]
        user: UserArgs,
    },
}

/// A trade ID within a league year.
#[derive(Debug, Args)]
pub struct TradeRef {
    #[clap(flatten)]
    pub league: LeagueYearArgs,

    pub trade: TradeId,

    #[clap(flatten)]
    pub user: UserArgs,
}

#[derive(Debug, Subcommand)]
pub enum TradeCmd {
    /// Offer a trade to another publisher
    Propose {
        #[clap(flatten)]
        league: LeagueYearArgs,

        /// Your publisher.
        proposer: PublisherId,

        /// The publisher you are trading with.
        counter_party: PublisherId,

        /// Your games to send (repeatable).
        #[clap(long = "give")]
        give: Vec<PublisherGameId>,

        /// Their games to receive (repeatable).
        #[clap(long = "receive")]
        receive: Vec<PublisherGameId>,

        #[clap(long, default_value_t = 0)]
        send_budget: u32,

        #[clap(long, default_value_t = 0)]
        receive_budget: u32,

        #[clap(long, default_value = "")]
        message: String,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Accept a trade offered to you
    Accept(TradeRef),

    /// Reject a trade offered to you
    Reject(TradeRef),

    /// Withdraw a trade you proposed
    Rescind(TradeRef),

    /// Execute an accepted trade (manager)
    Execute(TradeRef),

    /// Reject a trade on the league's behalf (manager)
    ManagerReject(TradeRef),

    /// List trades in a league year
    List {
        #[clap(flatten)]
        league: LeagueYearArgs,

        /// Only proposed and accepted trades.
        #[clap(long)]
        active: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum AuctionCmd {
    /// Open a special auction on one game (manager)
    Create {
        #[clap(flatten)]
        league: LeagueYearArgs,

        game: MasterGameId,

        /// When bidding closes (RFC 3339, e.g. 2026-05-01T18:00:00Z).
        end_time: DateTime<Utc>,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// List special auctions in a league year
    List {
        #[clap(flatten)]
        league: LeagueYearArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProcessCmd {
    /// Process every pending bid and drop for a year
    Actions {
        #[clap(long, short, default_value_t = Year::default())]
        year: Year,
    },

    /// Settle special auctions whose bidding has closed
    SpecialAuctions {
        #[clap(long, short, default_value_t = Year::default())]
        year: Year,
    },
}

#[derive(Debug, Subcommand)]
pub enum RoyaleCmd {
    /// Open a quarter for play (e.g. 2026-Q2)
    QuarterStart { quarter: YearQuarter },

    /// Close a quarter and record its winner
    QuarterFinish { quarter: YearQuarter },

    /// Create your Royale publisher for the active quarter
    Join {
        name: String,

        /// Quarter to join; defaults to the active one.
        #[clap(long)]
        quarter: Option<YearQuarter>,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Buy a game
    Purchase {
        publisher: PublisherId,

        game: MasterGameId,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Sell a game back
    Sell {
        publisher: PublisherId,

        game: MasterGameId,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Set advertising money on a game (0 to 10 dollars)
    Advertise {
        publisher: PublisherId,

        game: MasterGameId,

        amount: Decimal,

        #[clap(flatten)]
        user: UserArgs,
    },

    /// Games still available this quarter
    Games {
        #[clap(long)]
        quarter: Option<YearQuarter>,
    },

    /// Quarter standings
    Standings {
        #[clap(long)]
        quarter: Option<YearQuarter>,
    },

    /// Recompute fantasy points for a quarter
    UpdatePoints {
        #[clap(long)]
        quarter: Option<YearQuarter>,
    },
}
