//! Error-code catalogs for the EC2- and S3-compatible APIs
//!
//! Both trees have a `client` (4xx) and a `server` (5xx) family. Codes that
//! come with a status only match that status; the others match the whole
//! family range.
//!
//! ```
//! use stratus::catalog;
//! use stratus::matcher::ServiceError;
//!
//! let s3 = catalog::s3().unwrap();
//! let no_such_bucket = s3.get("client.NoSuchBucket").unwrap();
//! assert!(no_such_bucket.matches(&ServiceError::new(404, "NoSuchBucket")));
//! ```

use crate::matcher::{ErrorTree, RegistrationError};

/// `InsufficientInstanceCapacity` shows up as both client and server error.
const EC2_CLIENT_CODES: &[&str] = &[
    "AddressLimitExceeded",
    "AttachmentLimitExceeded",
    "AuthFailure",
    "Blocked",
    "CustomerGatewayLimitExceeded",
    "DependencyViolation",
    "DiskImageSizeTooLarge",
    "FilterLimitExceeded",
    "Gateway.NotAttached",
    "IdempotentParameterMismatch",
    "IncorrectInstanceState",
    "IncorrectState",
    "InstanceLimitExceeded",
    "InsufficientInstanceCapacity",
    "InsufficientReservedInstancesCapacity",
    "InternetGatewayLimitExceeded",
    "InvalidAMIAttributeItemValue",
    "InvalidAMIID.Malformed",
    "InvalidAMIID.NotFound",
    "InvalidAMIID.Unavailable",
    "InvalidAssociationID.NotFound",
    "InvalidAttachment.NotFound",
    "InvalidConversionTaskId",
    "InvalidCustomerGateway.DuplicateIpAddress",
    "InvalidCustomerGatewayID.NotFound",
    "InvalidDevice.InUse",
    "InvalidDhcpOptionsID.NotFound",
    "InvalidFormat",
    "InvalidFilter",
    "InvalidGatewayID.NotFound",
    "InvalidGroup.Duplicate",
    "InvalidGroupId.Malformed",
    "InvalidGroup.InUse",
    "InvalidGroup.NotFound",
    "InvalidGroup.Reserved",
    "InvalidInstanceID.Malformed",
    "InvalidInstanceID.NotFound",
    "InvalidInternetGatewayID.NotFound",
    "InvalidIPAddress.InUse",
    "InvalidKeyPair.Duplicate",
    "InvalidKeyPair.Format",
    "InvalidKeyPair.NotFound",
    "InvalidManifest",
    "InvalidNetworkAclEntry.NotFound",
    "InvalidNetworkAclID.NotFound",
    "InvalidParameterCombination",
    "InvalidParameterValue",
    "InvalidPermission.Duplicate",
    "InvalidPermission.Malformed",
    "InvalidReservationID.Malformed",
    "InvalidReservationID.NotFound",
    "InvalidRoute.NotFound",
    "InvalidRouteTableID.NotFound",
    "InvalidSecurity.RequestHasExpired",
    "InvalidSnapshotID.Malformed",
    "InvalidSnapshot.NotFound",
    "InvalidUserID.Malformed",
    "InvalidReservedInstancesId",
    "InvalidReservedInstancesOfferingId",
    "InvalidSubnetID.NotFound",
    "InvalidVolumeID.Duplicate",
    "InvalidVolumeID.Malformed",
    "InvalidVolumeID.ZoneMismatch",
    "InvalidVolume.NotFound",
    "InvalidVpcID.NotFound",
    "InvalidVpnConnectionID.NotFound",
    "InvalidVpnGatewayID.NotFound",
    "InvalidZone.NotFound",
    "LegacySecurityGroup",
    "MissingParameter",
    "NetworkAclEntryAlreadyExists",
    "NetworkAclEntryLimitExceeded",
    "NetworkAclLimitExceeded",
    "NonEBSInstance",
    "PendingSnapshotLimitExceeded",
    "PendingVerification",
    "OptInRequired",
    "RequestLimitExceeded",
    "ReservedInstancesLimitExceeded",
    "Resource.AlreadyAssociated",
    "ResourceLimitExceeded",
    "RouteAlreadyExists",
    "RouteLimitExceeded",
    "RouteTableLimitExceeded",
    "RulesPerSecurityGroupLimitExceeded",
    "SecurityGroupLimitExceeded",
    "SecurityGroupsPerInstanceLimitExceeded",
    "SnapshotLimitExceeded",
    "SubnetLimitExceeded",
    "UnknownParameter",
    "UnsupportedOperation",
    "VolumeLimitExceeded",
    "VpcLimitExceeded",
    "VpnConnectionLimitExceeded",
    "VpnGatewayAttachmentLimitExceeded",
    "VpnGatewayLimitExceeded",
];

const EC2_SERVER_CODES: &[&str] = &[
    "InsufficientAddressCapacity",
    "InsufficientInstanceCapacity",
    "InsufficientReservedInstanceCapacity",
    "InternalError",
    "Unavailable",
];

const S3_CLIENT_CODES: &[(&str, Option<&str>)] = &[
    ("AccessDenied", Some("403")),
    ("AccountProblem", Some("403")),
    ("AmbiguousGrantByEmailAddress", Some("400")),
    ("BadDigest", Some("400")),
    ("BucketAlreadyExists", Some("409")),
    ("BucketAlreadyOwnedByYou", Some("409")),
    ("BucketNotEmpty", Some("409")),
    ("CredentialsNotSupported", Some("400")),
    ("CrossLocationLoggingProhibited", Some("403")),
    ("EntityTooSmall", Some("400")),
    ("EntityTooLarge", Some("400")),
    ("ExpiredToken", Some("400")),
    ("IllegalVersioningConfigurationException", Some("400")),
    ("IncompleteBody", Some("400")),
    ("IncorrectNumberOfFilesInPostRequest", Some("400")),
    ("InlineDataTooLarge", Some("400")),
    ("InvalidAccessKeyId", Some("403")),
    ("InvalidAddressingHeader", None),
    ("InvalidArgument", Some("400")),
    ("InvalidBucketName", Some("400")),
    ("InvalidBucketState", Some("409")),
    ("InvalidDigest", Some("400")),
    ("InvalidLocationConstraint", Some("400")),
    ("InvalidPart", Some("400")),
    ("InvalidPartOrder", Some("400")),
    ("InvalidPayer", Some("403")),
    ("InvalidPolicyDocument", Some("400")),
    ("InvalidRange", Some("416")),
    ("InvalidRequest", Some("400")),
    ("InvalidSecurity", Some("403")),
    ("InvalidSOAPRequest", Some("400")),
    ("InvalidStorageClass", Some("400")),
    ("InvalidTargetBucketForLogging", Some("400")),
    ("InvalidToken", Some("400")),
    ("InvalidURI", Some("400")),
    ("KeyTooLong", Some("400")),
    ("MalformedACLError", Some("400")),
    ("MalformedPOSTRequest", Some("400")),
    ("MalformedXML", Some("400")),
    ("MaxMessageLengthExceeded", Some("400")),
    ("MaxPostPreDataLengthExceededError", Some("400")),
    ("MetadataTooLarge", Some("400")),
    ("MethodNotAllowed", Some("405")),
    ("MissingAttachment", None),
    ("MissingContentLength", Some("411")),
    ("MissingRequestBodyError", Some("400")),
    ("MissingSecurityElement", Some("400")),
    ("MissingSecurityHeader", Some("400")),
    ("NoLoggingStatusForKey", Some("400")),
    ("NoSuchBucket", Some("404")),
    ("NoSuchKey", Some("404")),
    ("NoSuchLifecycleConfiguration", Some("404")),
    ("NoSuchUpload", Some("404")),
    ("NoSuchVersion", Some("404")),
    ("NotSignedUp", Some("403")),
    ("NotSuchBucketPolicy", Some("404")),
    ("OperationAborted", Some("409")),
    ("PermanentRedirect", Some("301")),
    ("PreconditionFailed", Some("412")),
    ("Redirect", Some("307")),
    ("RequestIsNotMultiPartContent", Some("400")),
    ("RequestTimeout", Some("400")),
    ("RequestTimeTooSkewed", Some("403")),
    ("RequestTorrentOfBucketError", Some("400")),
    ("SignatureDoesNotMatch", Some("403")),
    ("TemporaryRedirect", Some("307")),
    ("TokenRefreshRequired", Some("400")),
    ("TooManyBuckets", Some("400")),
    ("UnexpectedContent", Some("400")),
    ("UnresolvableGrantByEmailAddress", Some("400")),
    ("UserKeyMustBeSpecified", Some("400")),
];

const S3_SERVER_CODES: &[(&str, Option<&str>)] = &[
    ("InternalError", Some("500")),
    ("NotImplemented", Some("501")),
    ("ServiceUnavailable", Some("503")),
    ("SlowDown", Some("503")),
];

/// Matcher tree for the EC2-compatible API
pub fn ec2() -> Result<ErrorTree, RegistrationError> {
    let mut tree = ErrorTree::standard();
    tree.register_all("client", EC2_CLIENT_CODES.iter().map(|code| (*code, None)))?;
    tree.register_all("server", EC2_SERVER_CODES.iter().map(|code| (*code, None)))?;
    Ok(tree)
}

/// Matcher tree for the S3-compatible API
pub fn s3() -> Result<ErrorTree, RegistrationError> {
    let mut tree = ErrorTree::standard();
    tree.register_all("client", S3_CLIENT_CODES.iter().copied())?;
    tree.register_all("server", S3_SERVER_CODES.iter().copied())?;
    Ok(tree)
}
