/// Numeric tags understood by the deployed editor clients. The hundreds digit
/// groups them: 0xx lifecycle and sync, 1xx chart metadata, 2xx realtime edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    InitConnection = 0,
    OutdatedClient = 1,
    CreateSession = 2,
    SessionCreated = 3,
    SessionClosed = 4,
    JoinSession = 5,
    LeaveSession = 6,
    BadSessionCode = 7,
    GoodSessionCode = 8,
    SyncRequest = 9,
    File = 10,
    ChartData = 11,
    SyncDone = 12,
    SyncBegin = 13,
    SyncEnd = 14,

    VersionChange = 100,
    TitleChange = 101,
    RubiChange = 102,
    ArtistChange = 103,
    AuthorChange = 104,
    DiffChange = 105,
    LevelChange = 106,
    ClearThresholdChange = 107,
    BpmTextChange = 108,
    PreviewStartChange = 109,
    PreviewTimeChange = 110,
    BgmOffsetChange = 111,
    BgaOffsetChange = 112,

    InsertNote = 200,
    InsertHoldNote = 201,
    InsertHoldSegment = 202,
    DeleteNote = 203,
    DeleteHoldNote = 204,
    EditNote = 205,
    BakeHold = 206,
    SplitHold = 207,
    StitchHold = 208,
    InsertGimmick = 209,
    EditGimmick = 210,
    DeleteGimmick = 211,
    ClientTimestamp = 212,
}

impl MessageType {
    pub const ALL: [MessageType; 41] = [
        MessageType::InitConnection,
        MessageType::OutdatedClient,
        MessageType::CreateSession,
        MessageType::SessionCreated,
        MessageType::SessionClosed,
        MessageType::JoinSession,
        MessageType::LeaveSession,
        MessageType::BadSessionCode,
        MessageType::GoodSessionCode,
        MessageType::SyncRequest,
        MessageType::File,
        MessageType::ChartData,
        MessageType::SyncDone,
        MessageType::SyncBegin,
        MessageType::SyncEnd,
        MessageType::VersionChange,
        MessageType::TitleChange,
        MessageType::RubiChange,
        MessageType::ArtistChange,
        MessageType::AuthorChange,
        MessageType::DiffChange,
        MessageType::LevelChange,
        MessageType::ClearThresholdChange,
        MessageType::BpmTextChange,
        MessageType::PreviewStartChange,
        MessageType::PreviewTimeChange,
        MessageType::BgmOffsetChange,
        MessageType::BgaOffsetChange,
        MessageType::InsertNote,
        MessageType::InsertHoldNote,
        MessageType::InsertHoldSegment,
        MessageType::DeleteNote,
        MessageType::DeleteHoldNote,
        MessageType::EditNote,
        MessageType::BakeHold,
        MessageType::SplitHold,
        MessageType::StitchHold,
        MessageType::InsertGimmick,
        MessageType::EditGimmick,
        MessageType::DeleteGimmick,
        MessageType::ClientTimestamp,
    ];

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Chart metadata changes.
    pub fn is_metadata(self) -> bool {
        (100..200).contains(&self.code())
    }

    /// Realtime edits, excluding the timestamp which gets rewritten.
    pub fn is_realtime_edit(self) -> bool {
        (200..300).contains(&self.code()) && self != MessageType::ClientTimestamp
    }
}
