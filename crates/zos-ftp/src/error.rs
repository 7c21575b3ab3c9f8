//! Error types for the session and transfer engine.

use thiserror::Error;

/// Errors produced by FTP session operations.
#[derive(Debug, Error)]
pub enum FtpError {
    /// The server answered with a reply code other than the one the
    /// command expected. The payload keeps the raw reply text so the
    /// server's own diagnostic stays legible.
    #[error("FTP response code: got {got}, want {want}, message: {message}")]
    UnexpectedReply {
        got: u16,
        want: u16,
        message: String,
    },

    /// Dial, read, or write failure. The control connection is
    /// considered tainted afterwards.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS negotiation or wrapping failure.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The server acknowledged `SITE` with 200 but rejected or
    /// ignored a sub-parameter.
    #[error("error : '{command}', {detail}")]
    SiteRejected { command: String, detail: String },

    /// A locally refused out-of-domain argument; nothing was sent to
    /// the server.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The `PASV` reply did not carry a parsable host/port tuple.
    #[error("cannot find port in text: {0}")]
    PassiveFormat(String),

    /// `SYST` reported something other than MVS.
    #[error("unsupported system type: {0}")]
    UnsupportedSystem(String),

    /// A status reply did not match the extraction convention for
    /// the requested feature.
    #[error("could not parse {feature} from status reply: {response}")]
    StatusFormat { feature: String, response: String },

    /// The caller's cancellation token tripped while waiting for an
    /// exchange. The exchange itself runs to completion on a worker.
    #[error("command cancelled")]
    Cancelled,

    /// JES submission or completion failure.
    #[error(transparent)]
    Jes(#[from] JesError),

    /// A listing record failed to parse.
    #[error(transparent)]
    Records(#[from] zos_ftp_records::RecordsError),
}

/// Classified JES job failures. Spool analysis scans the retrieved
/// output for the known abend and IEF message prefixes; the return
/// code is carried whenever one could be extracted, -1 otherwise.
#[derive(Debug, Error)]
pub enum JesError {
    /// The store completed but no `JOBnnnnn` id appeared in the
    /// server's reply.
    #[error("failed to retrieve job id from response: {0}")]
    MissingJobId(String),

    /// The retrieved spool carries no `$HASP395 ... ENDED` marker.
    #[error("job has not ended: {0}")]
    NotEnded(String),

    /// The job is still executing.
    #[error("job {0} is still active")]
    Active(String),

    /// The converter rejected the JCL; the job never ran.
    #[error("job {0} ended with a JCL error")]
    JclError(String),

    /// The spool carries abend messages only.
    #[error("job {name} abended, rc={rc}: {details}")]
    Abend {
        name: String,
        rc: i32,
        details: String,
    },

    /// The spool carries IEF failure messages only.
    #[error("job {name} failed with IEF errors, rc={rc}: {details}")]
    Ief {
        name: String,
        rc: i32,
        details: String,
    },

    /// The spool carries both IEF failure and abend messages.
    #[error("job {name} failed with IEF errors and abended, rc={rc}: {details}")]
    IefAndAbend {
        name: String,
        rc: i32,
        details: String,
    },

    /// The job ended but no `RC=` value could be extracted and no
    /// failure message matched.
    #[error("failed to retrieve return code from response: {0}")]
    MissingReturnCode(String),
}

/// Convenience result type for FTP operations.
pub type Result<T> = std::result::Result<T, FtpError>;
