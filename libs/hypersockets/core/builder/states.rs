//! Compile-time markers for the builder
//!
//! `build()` only exists once both the URL and the event sink are set.

use std::marker::PhantomData;

pub trait UrlState {}

pub struct NoUrl;
impl UrlState for NoUrl {}

pub struct HasUrl;
impl UrlState for HasUrl {}

pub trait EventsState {}

pub struct NoEvents;
impl EventsState for NoEvents {}

pub struct HasEvents;
impl EventsState for HasEvents {}

/// Carries the URL and sink markers without storing anything
#[derive(Debug, Clone, Copy)]
pub struct TypeState<U, E> {
    _url: PhantomData<U>,
    _events: PhantomData<E>,
}

impl<U, E> TypeState<U, E> {
    pub(crate) fn new() -> Self {
        Self {
            _url: PhantomData,
            _events: PhantomData,
        }
    }
}
