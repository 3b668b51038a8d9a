use crate::error::LaunchError;
use crate::task::BackendKind;

/// The backend-specific block of a request, once exactly one was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend<E, C> {
    Ecs(E),
    Codebuild(C),
}

impl<E, C> Backend<E, C> {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Ecs(_) => BackendKind::Ecs,
            Backend::Codebuild(_) => BackendKind::Codebuild,
        }
    }
}

/// Requests carrying an optional block per backend.
pub trait BackendParams {
    type Ecs;
    type Codebuild;

    fn ecs(&self) -> Option<&Self::Ecs>;
    fn codebuild(&self) -> Option<&Self::Codebuild>;

    /// Exactly one block must be populated.
    fn backend(&self) -> Result<Backend<&Self::Ecs, &Self::Codebuild>, LaunchError> {
        match (self.ecs(), self.codebuild()) {
            (Some(ecs), None) => Ok(Backend::Ecs(ecs)),
            (None, Some(codebuild)) => Ok(Backend::Codebuild(codebuild)),
            (None, None) => Err(LaunchError::MissingBackendParams),
            (Some(_), Some(_)) => Err(LaunchError::InvalidBackendParams),
        }
    }

    /// Route on a request that came from an earlier result; the first
    /// populated block wins.
    fn backend_kind_lenient(&self) -> Result<BackendKind, LaunchError> {
        if self.ecs().is_some() {
            Ok(BackendKind::Ecs)
        } else if self.codebuild().is_some() {
            Ok(BackendKind::Codebuild)
        } else {
            Err(LaunchError::MissingBackendParams)
        }
    }
}

macro_rules! impl_backend_params {
    ($params:ty, $ecs:ty, $codebuild:ty) => {
        impl $crate::backend::BackendParams for $params {
            type Ecs = $ecs;
            type Codebuild = $codebuild;

            fn ecs(&self) -> Option<&Self::Ecs> {
                self.ecs.as_ref()
            }

            fn codebuild(&self) -> Option<&Self::Codebuild> {
                self.codebuild.as_ref()
            }
        }
    };
}

pub(crate) use impl_backend_params;
