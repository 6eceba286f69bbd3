use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, HttpResponse};

use crate::error::Error;

use super::{LocalScheduler, Notification, NotificationId};

#[get("/notifications")]
#[tracing::instrument(skip(scheduler))]
pub async fn get_notifications(
    scheduler: Data<LocalScheduler>,
) -> Result<Json<Vec<Notification>>, Error> {
    let notifications = scheduler.stored_notifications().await?;

    Ok(Json(notifications))
}

#[post("/notifications/{notification_id}/read")]
#[tracing::instrument(skip(scheduler))]
pub async fn mark_notification_as_read(
    scheduler: Data<LocalScheduler>,
    params: Path<NotificationId>,
) -> Result<HttpResponse, Error> {
    let notification_id = params.into_inner();

    if !scheduler.mark_as_read(notification_id).await? {
        return Err(Error::NotificationDoesNotExist { notification_id });
    }

    Ok(HttpResponse::NoContent().finish())
}

#[delete("/notifications/{notification_id}")]
#[tracing::instrument(skip(scheduler))]
pub async fn cancel_notification(
    scheduler: Data<LocalScheduler>,
    params: Path<NotificationId>,
) -> Result<HttpResponse, Error> {
    let notification_id = params.into_inner();

    if !scheduler.remove(notification_id).await? {
        return Err(Error::NotificationDoesNotExist { notification_id });
    }

    Ok(HttpResponse::NoContent().finish())
}
